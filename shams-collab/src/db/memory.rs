use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use shams_core::{MaintenanceStatus, RequestStatus, Role};

use crate::{
    Commit, Database, DatabaseError, HostelData, HostelRequestData, MessApplicationData, MessData,
    MessFeedbackData, Mismatch, NewFeedback, NewHostel, NewHostelRequest, NewMess, NewMessApplication,
    NewRoom, NewSession, NewUser, Placement, PrimaryKey, RequestFilter, Result, RoomData,
    RoomFilter, SessionData, UpdatedHostel, UpdatedMess, UpdatedRoom, UserData, Verdict,
};

/// A database kept entirely in memory.
///
/// All state sits behind one lock, so every call is atomic with respect to
/// every other call. Used when no Postgres URL is configured, and in tests.
#[derive(Default)]
pub struct MemoryDatabase {
    state: Mutex<MemoryState>,
}

#[derive(Default)]
struct MemoryState {
    last_id: PrimaryKey,
    users: BTreeMap<PrimaryKey, UserData>,
    sessions: BTreeMap<PrimaryKey, StoredSession>,
    hostels: BTreeMap<PrimaryKey, HostelData>,
    rooms: BTreeMap<PrimaryKey, RoomData>,
    messes: BTreeMap<PrimaryKey, MessData>,
    requests: BTreeMap<PrimaryKey, HostelRequestData>,
    applications: BTreeMap<PrimaryKey, MessApplicationData>,
    feedback: BTreeMap<PrimaryKey, MessFeedbackData>,
}

struct StoredSession {
    id: PrimaryKey,
    token: String,
    user_id: PrimaryKey,
    expires_at: DateTime<Utc>,
}

impl MemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }
}

fn not_found(resource: &'static str, identifier: &'static str) -> DatabaseError {
    DatabaseError::NotFound {
        resource,
        identifier,
    }
}

fn room_order(a: &RoomData, b: &RoomData) -> std::cmp::Ordering {
    (a.floor, a.room_number.len(), &a.room_number).cmp(&(
        b.floor,
        b.room_number.len(),
        &b.room_number,
    ))
}

impl MemoryState {
    fn next_id(&mut self) -> PrimaryKey {
        self.last_id += 1;
        self.last_id
    }

    fn user(&self, user_id: PrimaryKey) -> Result<&UserData> {
        self.users.get(&user_id).ok_or(not_found("user", "id"))
    }

    fn hostel(&self, hostel_id: PrimaryKey) -> Result<&HostelData> {
        self.hostels
            .get(&hostel_id)
            .ok_or(not_found("hostel", "id"))
    }

    fn room(&self, room_id: PrimaryKey) -> Result<&RoomData> {
        self.rooms.get(&room_id).ok_or(not_found("room", "id"))
    }

    fn mess(&self, mess_id: PrimaryKey) -> Result<&MessData> {
        self.messes.get(&mess_id).ok_or(not_found("mess", "id"))
    }

    fn session(&self, token: &str) -> Result<SessionData> {
        let session = self
            .sessions
            .values()
            .find(|s| s.token == token)
            .ok_or(not_found("session", "token"))?;

        Ok(SessionData {
            id: session.id,
            token: session.token.clone(),
            expires_at: session.expires_at,
            user: self.user(session.user_id)?.clone(),
        })
    }

    fn create_user(&mut self, new_user: NewUser) -> Result<UserData> {
        if self.users.values().any(|u| u.username == new_user.username) {
            return Err(DatabaseError::Conflict {
                resource: "user",
                field: "username",
                value: new_user.username,
            });
        }

        if let Some(hostel_id) = new_user.assigned_hostel_id {
            self.hostel(hostel_id)?;
        }

        let user = UserData {
            id: self.next_id(),
            username: new_user.username,
            password: new_user.password,
            display_name: new_user.display_name,
            role: new_user.role,
            gender: new_user.gender,
            hostel_identifier: new_user.hostel_identifier,
            room_id: None,
            mess_id: None,
            assigned_hostel_id: new_user.assigned_hostel_id,
            assigned_floor: new_user.assigned_floor,
        };

        self.users.insert(user.id, user.clone());
        Ok(user)
    }

    fn create_session(&mut self, new_session: NewSession) -> Result<SessionData> {
        if self.sessions.values().any(|s| s.token == new_session.token) {
            return Err(DatabaseError::Conflict {
                resource: "session",
                field: "token",
                value: new_session.token,
            });
        }

        self.user(new_session.user_id)?;

        let id = self.next_id();
        let token = new_session.token.clone();

        self.sessions.insert(
            id,
            StoredSession {
                id,
                token: new_session.token,
                user_id: new_session.user_id,
                expires_at: new_session.expires_at,
            },
        );

        self.session(&token)
    }

    fn ensure_unique_hostel_name(&self, name: &str, except: Option<PrimaryKey>) -> Result<()> {
        let taken = self
            .hostels
            .values()
            .any(|h| h.name == name && Some(h.id) != except);

        if taken {
            return Err(DatabaseError::Conflict {
                resource: "hostel",
                field: "name",
                value: name.to_string(),
            });
        }

        Ok(())
    }

    fn create_hostel(&mut self, new_hostel: NewHostel) -> Result<HostelData> {
        self.ensure_unique_hostel_name(&new_hostel.name, None)?;

        let hostel = HostelData {
            id: self.next_id(),
            name: new_hostel.name,
            block: new_hostel.block,
            gender: new_hostel.gender,
            total_rooms: new_hostel.total_rooms,
            total_capacity: new_hostel.total_capacity,
            active: true,
            facilities: new_hostel.facilities,
            address: new_hostel.address,
        };

        self.hostels.insert(hostel.id, hostel.clone());
        Ok(hostel)
    }

    fn update_hostel(&mut self, updated: UpdatedHostel) -> Result<HostelData> {
        self.hostel(updated.id)?;

        if let Some(name) = &updated.name {
            self.ensure_unique_hostel_name(name, Some(updated.id))?;
        }

        let hostel = self
            .hostels
            .get_mut(&updated.id)
            .ok_or(not_found("hostel", "id"))?;

        if let Some(name) = updated.name {
            hostel.name = name;
        }
        if let Some(block) = updated.block {
            hostel.block = block;
        }
        if let Some(total_rooms) = updated.total_rooms {
            hostel.total_rooms = total_rooms;
        }
        if let Some(total_capacity) = updated.total_capacity {
            hostel.total_capacity = total_capacity;
        }
        if let Some(active) = updated.active {
            hostel.active = active;
        }
        if let Some(facilities) = updated.facilities {
            hostel.facilities = facilities;
        }
        if let Some(address) = updated.address {
            hostel.address = address;
        }

        Ok(hostel.clone())
    }

    fn delete_hostel(&mut self, hostel_id: PrimaryKey) -> Result<()> {
        self.hostel(hostel_id)?;

        let dependents = if self.rooms.values().any(|r| r.hostel_id == hostel_id) {
            Some("rooms")
        } else if self.messes.values().any(|m| m.hostel_id == hostel_id) {
            Some("messes")
        } else if self.requests.values().any(|r| r.hostel_id == hostel_id)
            || self.applications.values().any(|a| a.hostel_id == hostel_id)
        {
            Some("requests")
        } else if self
            .users
            .values()
            .any(|u| u.assigned_hostel_id == Some(hostel_id))
        {
            Some("wardens")
        } else {
            None
        };

        if let Some(dependents) = dependents {
            return Err(DatabaseError::HasDependents {
                resource: "hostel",
                dependents,
            });
        }

        self.hostels.remove(&hostel_id);
        Ok(())
    }

    fn create_room(&mut self, new_room: NewRoom) -> Result<RoomData> {
        self.hostel(new_room.hostel_id)?;

        let taken = self.rooms.values().any(|r| {
            r.hostel_id == new_room.hostel_id
                && r.floor == new_room.floor
                && r.room_number == new_room.room_number
        });

        if taken {
            return Err(DatabaseError::Conflict {
                resource: "room",
                field: "hostel:floor:room_number",
                value: format!(
                    "{}:{}:{}",
                    new_room.hostel_id, new_room.floor, new_room.room_number
                ),
            });
        }

        let room = RoomData {
            id: self.next_id(),
            hostel_id: new_room.hostel_id,
            floor: new_room.floor,
            room_number: new_room.room_number,
            room_type: new_room.room_type,
            capacity: new_room.capacity,
            gender: new_room.gender,
            has_ac: new_room.has_ac,
            fee_per_year: new_room.fee_per_year,
            facilities: new_room.facilities,
            maintenance: MaintenanceStatus::Good,
            occupants: vec![],
            warden_id: new_room.warden_id,
        };

        self.rooms.insert(room.id, room.clone());
        Ok(room)
    }

    fn update_room(&mut self, updated: UpdatedRoom) -> Result<Commit<RoomData>> {
        let room = self
            .rooms
            .get_mut(&updated.id)
            .ok_or(not_found("room", "id"))?;

        if let Some(capacity) = updated.capacity {
            let occupancy = room.occupancy();

            if !occupancy.fits_within(capacity) {
                return Ok(Commit::BelowOccupancy {
                    occupied: occupancy.occupied,
                });
            }

            room.capacity = capacity;
        }
        if let Some(has_ac) = updated.has_ac {
            room.has_ac = has_ac;
        }
        if let Some(fee_per_year) = updated.fee_per_year {
            room.fee_per_year = fee_per_year;
        }
        if let Some(facilities) = updated.facilities {
            room.facilities = facilities;
        }
        if let Some(maintenance) = updated.maintenance {
            room.maintenance = maintenance;
        }
        if let Some(warden_id) = updated.warden_id {
            room.warden_id = Some(warden_id);
        }

        Ok(Commit::Done(room.clone()))
    }

    fn delete_room(&mut self, room_id: PrimaryKey) -> Result<()> {
        if !self.room(room_id)?.occupants.is_empty() {
            return Err(DatabaseError::HasDependents {
                resource: "room",
                dependents: "occupants",
            });
        }

        for request in self.requests.values_mut() {
            if request.assigned_room_id == Some(room_id) {
                request.assigned_room_id = None;
            }
        }

        self.rooms.remove(&room_id);
        Ok(())
    }

    fn release_student(&mut self, student_id: PrimaryKey) -> Result<RoomData> {
        let room_id = self
            .user(student_id)?
            .room_id
            .ok_or(not_found("room", "student_id"))?;

        let room = self
            .rooms
            .get_mut(&room_id)
            .ok_or(not_found("room", "id"))?;
        room.occupants.retain(|id| *id != student_id);
        let room = room.clone();

        if let Some(student) = self.users.get_mut(&student_id) {
            student.room_id = None;
        }

        Ok(room)
    }

    fn create_mess(&mut self, new_mess: NewMess) -> Result<MessData> {
        self.hostel(new_mess.hostel_id)?;

        let mess = MessData {
            id: self.next_id(),
            hostel_id: new_mess.hostel_id,
            name: new_mess.name,
            capacity: new_mess.capacity,
            menu_type: new_mess.menu_type,
            facilities: new_mess.facilities,
            active: true,
        };

        self.messes.insert(mess.id, mess.clone());
        Ok(mess)
    }

    fn update_mess(&mut self, updated: UpdatedMess) -> Result<MessData> {
        let mess = self
            .messes
            .get_mut(&updated.id)
            .ok_or(not_found("mess", "id"))?;

        if let Some(name) = updated.name {
            mess.name = name;
        }
        if let Some(capacity) = updated.capacity {
            mess.capacity = capacity;
        }
        if let Some(menu_type) = updated.menu_type {
            mess.menu_type = menu_type;
        }
        if let Some(facilities) = updated.facilities {
            mess.facilities = facilities;
        }
        if let Some(active) = updated.active {
            mess.active = active;
        }

        Ok(mess.clone())
    }

    fn delete_mess(&mut self, mess_id: PrimaryKey) -> Result<()> {
        self.mess(mess_id)?;

        let referenced = self.users.values().any(|u| u.mess_id == Some(mess_id))
            || self.applications.values().any(|a| a.mess_id == mess_id);

        if referenced {
            return Err(DatabaseError::HasDependents {
                resource: "mess",
                dependents: "applications",
            });
        }

        self.messes.remove(&mess_id);
        Ok(())
    }

    fn create_hostel_request(&mut self, new_request: NewHostelRequest) -> Result<HostelRequestData> {
        self.user(new_request.student_id)?;
        self.hostel(new_request.hostel_id)?;

        let request = HostelRequestData {
            id: self.next_id(),
            student_id: new_request.student_id,
            hostel_id: new_request.hostel_id,
            room_type: new_request.room_type,
            ac_preference: new_request.ac_preference,
            gender: new_request.gender,
            year: new_request.year,
            floor_preference: new_request.floor_preference,
            status: RequestStatus::Pending,
            assigned_room_id: None,
            approver_id: None,
            remarks: None,
            created_at: Utc::now(),
            decided_at: None,
        };

        self.requests.insert(request.id, request.clone());
        Ok(request)
    }

    fn place_student(&mut self, placement: Placement) -> Result<Commit<HostelRequestData>> {
        let request = self
            .requests
            .get(&placement.request_id)
            .ok_or(not_found("hostel request", "id"))?;

        if request.status.is_terminal() {
            return Ok(Commit::AlreadyDecided(request.status));
        }

        let room = self.room(placement.room_id)?;

        if room.gender != request.gender {
            return Ok(Commit::Mismatch(Mismatch::Gender));
        }

        if room.room_type != request.room_type {
            return Ok(Commit::Mismatch(Mismatch::RoomType));
        }

        if room.has_ac != request.ac_preference.has_ac() {
            return Ok(Commit::Mismatch(Mismatch::AirConditioning));
        }

        if self.user(request.student_id)?.room_id.is_some() {
            return Ok(Commit::AlreadyPlaced);
        }

        if !room.occupancy().has_vacancy() {
            return Ok(Commit::Full);
        }

        let student_id = request.student_id;

        if let Some(room) = self.rooms.get_mut(&placement.room_id) {
            room.occupants.push(student_id);
        }

        if let Some(student) = self.users.get_mut(&student_id) {
            student.room_id = Some(placement.room_id);
        }

        let request = self
            .requests
            .get_mut(&placement.request_id)
            .ok_or(not_found("hostel request", "id"))?;

        request.status = RequestStatus::Approved;
        request.assigned_room_id = Some(placement.room_id);
        request.approver_id = Some(placement.approver_id);
        request.remarks = placement.remarks;
        request.decided_at = Some(Utc::now());

        Ok(Commit::Done(request.clone()))
    }

    fn reject_hostel_request(&mut self, verdict: Verdict) -> Result<Commit<HostelRequestData>> {
        let request = self
            .requests
            .get_mut(&verdict.id)
            .ok_or(not_found("hostel request", "id"))?;

        if request.status.is_terminal() {
            return Ok(Commit::AlreadyDecided(request.status));
        }

        request.status = RequestStatus::Rejected;
        request.approver_id = Some(verdict.approver_id);
        request.remarks = verdict.remarks;
        request.decided_at = Some(Utc::now());

        Ok(Commit::Done(request.clone()))
    }

    fn create_mess_application(
        &mut self,
        new_application: NewMessApplication,
    ) -> Result<MessApplicationData> {
        self.user(new_application.student_id)?;
        self.hostel(new_application.hostel_id)?;
        self.mess(new_application.mess_id)?;

        let application = MessApplicationData {
            id: self.next_id(),
            student_id: new_application.student_id,
            hostel_id: new_application.hostel_id,
            mess_id: new_application.mess_id,
            food_preference: new_application.food_preference,
            status: RequestStatus::Pending,
            approver_id: None,
            remarks: None,
            created_at: Utc::now(),
            decided_at: None,
        };

        self.applications.insert(application.id, application.clone());
        Ok(application)
    }

    fn enroll_student(
        &mut self,
        verdict: Verdict,
        enforce_capacity: bool,
    ) -> Result<Commit<MessApplicationData>> {
        let application = self
            .applications
            .get(&verdict.id)
            .ok_or(not_found("mess application", "id"))?;

        if application.status.is_terminal() {
            return Ok(Commit::AlreadyDecided(application.status));
        }

        let mess = self.mess(application.mess_id)?;
        let student_id = application.student_id;
        let mess_id = mess.id;

        if !mess.active {
            return Ok(Commit::Mismatch(Mismatch::InactiveMess));
        }

        if !application.food_preference.compatible_with(mess.menu_type) {
            return Ok(Commit::Mismatch(Mismatch::Menu));
        }

        if enforce_capacity {
            let members = self
                .users
                .values()
                .filter(|u| u.mess_id == Some(mess_id) && u.id != student_id)
                .count();

            if members as i32 >= mess.capacity {
                return Ok(Commit::Full);
            }
        }

        let student = self
            .users
            .get_mut(&student_id)
            .ok_or(not_found("user", "id"))?;
        student.mess_id = Some(mess_id);

        let application = self
            .applications
            .get_mut(&verdict.id)
            .ok_or(not_found("mess application", "id"))?;

        application.status = RequestStatus::Approved;
        application.approver_id = Some(verdict.approver_id);
        application.remarks = verdict.remarks;
        application.decided_at = Some(Utc::now());

        Ok(Commit::Done(application.clone()))
    }

    fn reject_mess_application(&mut self, verdict: Verdict) -> Result<Commit<MessApplicationData>> {
        let application = self
            .applications
            .get_mut(&verdict.id)
            .ok_or(not_found("mess application", "id"))?;

        if application.status.is_terminal() {
            return Ok(Commit::AlreadyDecided(application.status));
        }

        application.status = RequestStatus::Rejected;
        application.approver_id = Some(verdict.approver_id);
        application.remarks = verdict.remarks;
        application.decided_at = Some(Utc::now());

        Ok(Commit::Done(application.clone()))
    }

    fn create_feedback(&mut self, new_feedback: NewFeedback) -> Result<MessFeedbackData> {
        self.user(new_feedback.student_id)?;

        let feedback = MessFeedbackData {
            id: self.next_id(),
            student_id: new_feedback.student_id,
            menu_item: new_feedback.menu_item,
            rating: new_feedback.rating,
            comments: new_feedback.comments,
            created_at: Utc::now(),
        };

        self.feedback.insert(feedback.id, feedback.clone());
        Ok(feedback)
    }
}

fn matches_request_filter(
    filter: &RequestFilter,
    student_id: PrimaryKey,
    hostel_id: PrimaryKey,
    status: RequestStatus,
) -> bool {
    filter.student_id.map_or(true, |id| id == student_id)
        && filter.hostel_id.map_or(true, |id| id == hostel_id)
        && filter.status.map_or(true, |s| s == status)
}

#[async_trait]
impl Database for MemoryDatabase {
    async fn any_admin(&self) -> Result<bool> {
        Ok(self
            .state
            .lock()
            .users
            .values()
            .any(|u| u.role == Role::Admin))
    }

    async fn user_by_id(&self, user_id: PrimaryKey) -> Result<UserData> {
        self.state.lock().user(user_id).cloned()
    }

    async fn user_by_username(&self, username: &str) -> Result<UserData> {
        self.state
            .lock()
            .users
            .values()
            .find(|u| u.username == username)
            .cloned()
            .ok_or(not_found("user", "username"))
    }

    async fn create_user(&self, new_user: NewUser) -> Result<UserData> {
        self.state.lock().create_user(new_user)
    }

    async fn session_by_token(&self, token: &str) -> Result<SessionData> {
        self.state.lock().session(token)
    }

    async fn create_session(&self, new_session: NewSession) -> Result<SessionData> {
        self.state.lock().create_session(new_session)
    }

    async fn delete_session_by_token(&self, token: &str) -> Result<()> {
        let mut state = self.state.lock();
        let session = state.session(token)?;

        state.sessions.remove(&session.id);
        Ok(())
    }

    async fn clear_expired_sessions(&self) -> Result<()> {
        let now = Utc::now();
        self.state.lock().sessions.retain(|_, s| s.expires_at > now);

        Ok(())
    }

    async fn hostel_by_id(&self, hostel_id: PrimaryKey) -> Result<HostelData> {
        self.state.lock().hostel(hostel_id).cloned()
    }

    async fn list_hostels(&self) -> Result<Vec<HostelData>> {
        Ok(self.state.lock().hostels.values().cloned().collect())
    }

    async fn create_hostel(&self, new_hostel: NewHostel) -> Result<HostelData> {
        self.state.lock().create_hostel(new_hostel)
    }

    async fn update_hostel(&self, updated_hostel: UpdatedHostel) -> Result<HostelData> {
        self.state.lock().update_hostel(updated_hostel)
    }

    async fn delete_hostel(&self, hostel_id: PrimaryKey) -> Result<()> {
        self.state.lock().delete_hostel(hostel_id)
    }

    async fn room_by_id(&self, room_id: PrimaryKey) -> Result<RoomData> {
        self.state.lock().room(room_id).cloned()
    }

    async fn list_rooms(&self, hostel_id: PrimaryKey) -> Result<Vec<RoomData>> {
        let state = self.state.lock();
        state.hostel(hostel_id)?;

        let mut rooms: Vec<_> = state
            .rooms
            .values()
            .filter(|r| r.hostel_id == hostel_id)
            .cloned()
            .collect();

        rooms.sort_by(room_order);
        Ok(rooms)
    }

    async fn available_rooms(&self, filter: RoomFilter) -> Result<Vec<RoomData>> {
        let mut rooms: Vec<_> = self
            .state
            .lock()
            .rooms
            .values()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect();

        rooms.sort_by(room_order);
        Ok(rooms)
    }

    async fn create_room(&self, new_room: NewRoom) -> Result<RoomData> {
        self.state.lock().create_room(new_room)
    }

    async fn update_room(&self, updated_room: UpdatedRoom) -> Result<Commit<RoomData>> {
        self.state.lock().update_room(updated_room)
    }

    async fn delete_room(&self, room_id: PrimaryKey) -> Result<()> {
        self.state.lock().delete_room(room_id)
    }

    async fn release_student(&self, student_id: PrimaryKey) -> Result<RoomData> {
        self.state.lock().release_student(student_id)
    }

    async fn mess_by_id(&self, mess_id: PrimaryKey) -> Result<MessData> {
        self.state.lock().mess(mess_id).cloned()
    }

    async fn list_messes(&self, hostel_id: PrimaryKey) -> Result<Vec<MessData>> {
        let state = self.state.lock();
        state.hostel(hostel_id)?;

        Ok(state
            .messes
            .values()
            .filter(|m| m.hostel_id == hostel_id)
            .cloned()
            .collect())
    }

    async fn create_mess(&self, new_mess: NewMess) -> Result<MessData> {
        self.state.lock().create_mess(new_mess)
    }

    async fn update_mess(&self, updated_mess: UpdatedMess) -> Result<MessData> {
        self.state.lock().update_mess(updated_mess)
    }

    async fn delete_mess(&self, mess_id: PrimaryKey) -> Result<()> {
        self.state.lock().delete_mess(mess_id)
    }

    async fn hostel_request_by_id(&self, request_id: PrimaryKey) -> Result<HostelRequestData> {
        self.state
            .lock()
            .requests
            .get(&request_id)
            .cloned()
            .ok_or(not_found("hostel request", "id"))
    }

    async fn list_hostel_requests(
        &self,
        filter: RequestFilter,
    ) -> Result<Vec<HostelRequestData>> {
        Ok(self
            .state
            .lock()
            .requests
            .values()
            .filter(|r| matches_request_filter(&filter, r.student_id, r.hostel_id, r.status))
            .cloned()
            .collect())
    }

    async fn create_hostel_request(
        &self,
        new_request: NewHostelRequest,
    ) -> Result<HostelRequestData> {
        self.state.lock().create_hostel_request(new_request)
    }

    async fn place_student(&self, placement: Placement) -> Result<Commit<HostelRequestData>> {
        self.state.lock().place_student(placement)
    }

    async fn reject_hostel_request(
        &self,
        verdict: Verdict,
    ) -> Result<Commit<HostelRequestData>> {
        self.state.lock().reject_hostel_request(verdict)
    }

    async fn mess_application_by_id(
        &self,
        application_id: PrimaryKey,
    ) -> Result<MessApplicationData> {
        self.state
            .lock()
            .applications
            .get(&application_id)
            .cloned()
            .ok_or(not_found("mess application", "id"))
    }

    async fn list_mess_applications(
        &self,
        filter: RequestFilter,
    ) -> Result<Vec<MessApplicationData>> {
        Ok(self
            .state
            .lock()
            .applications
            .values()
            .filter(|a| matches_request_filter(&filter, a.student_id, a.hostel_id, a.status))
            .cloned()
            .collect())
    }

    async fn create_mess_application(
        &self,
        new_application: NewMessApplication,
    ) -> Result<MessApplicationData> {
        self.state.lock().create_mess_application(new_application)
    }

    async fn enroll_student(
        &self,
        verdict: Verdict,
        enforce_capacity: bool,
    ) -> Result<Commit<MessApplicationData>> {
        self.state.lock().enroll_student(verdict, enforce_capacity)
    }

    async fn reject_mess_application(
        &self,
        verdict: Verdict,
    ) -> Result<Commit<MessApplicationData>> {
        self.state.lock().reject_mess_application(verdict)
    }

    async fn create_feedback(&self, new_feedback: NewFeedback) -> Result<MessFeedbackData> {
        self.state.lock().create_feedback(new_feedback)
    }

    async fn list_feedback(&self) -> Result<Vec<MessFeedbackData>> {
        Ok(self.state.lock().feedback.values().cloned().collect())
    }
}
