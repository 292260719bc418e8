use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use shams_core::{Gender, MenuType, ParseKindError, Rating, RoomType, StudyYear};
use sqlx::{postgres::PgPoolOptions, query, query_as, Error as SqlxError, FromRow, PgPool};

use crate::{
    Commit, Database, DatabaseError, DatabaseResult, HostelData, HostelRequestData,
    IntoDatabaseError, MessApplicationData, Mismatch, MessData, MessFeedbackData, NewFeedback, NewHostel,
    NewHostelRequest, NewMess, NewMessApplication, NewRoom, NewSession, NewUser, Placement,
    PrimaryKey, RequestFilter, Result, RoomData, RoomFilter, SessionData, UpdatedHostel,
    UpdatedMess, UpdatedRoom, UserData, Verdict,
};

/// Room columns plus the ordered occupant ids
const ROOM_SELECT: &str = "
    SELECT
        rooms.*,
        ARRAY(
            SELECT student_id FROM room_occupants
            WHERE room_occupants.room_id = rooms.id
            ORDER BY position
        ) AS occupants
    FROM rooms";

const ROOM_ORDER: &str = "ORDER BY floor, length(room_number), room_number";

/// A postgres database implementation for SHAMS
pub struct PgDatabase {
    pool: PgPool,
}

impl PgDatabase {
    /// Connects and brings the schema up to date
    pub async fn new(url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(url)
            .await
            .map_err(|e| e.any())?;

        sqlx::migrate!()
            .run(&pool)
            .await
            .map_err(|e| DatabaseError::Internal(Box::new(e)))?;

        Ok(Self { pool })
    }

    async fn hostel_by_name(&self, name: &str) -> Result<HostelData> {
        query_as::<_, HostelRow>("SELECT * FROM hostels WHERE name = $1")
            .bind(name)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| e.not_found_or("hostel", "name"))?
            .try_into()
    }
}

fn parse<T>(value: &str) -> Result<T>
where
    T: FromStr<Err = ParseKindError>,
{
    value
        .parse()
        .map_err(|e: ParseKindError| DatabaseError::Internal(Box::new(e)))
}

fn parse_optional<T>(value: Option<String>) -> Result<Option<T>>
where
    T: FromStr<Err = ParseKindError>,
{
    value.as_deref().map(parse).transpose()
}

#[derive(FromRow)]
struct UserRow {
    id: i32,
    username: String,
    password: String,
    display_name: String,
    role: String,
    gender: Option<String>,
    hostel_identifier: Option<String>,
    room_id: Option<i32>,
    mess_id: Option<i32>,
    assigned_hostel_id: Option<i32>,
    assigned_floor: Option<i32>,
}

impl TryFrom<UserRow> for UserData {
    type Error = DatabaseError;

    fn try_from(row: UserRow) -> Result<Self> {
        Ok(Self {
            id: row.id,
            username: row.username,
            password: row.password,
            display_name: row.display_name,
            role: parse(&row.role)?,
            gender: parse_optional(row.gender)?,
            hostel_identifier: row.hostel_identifier,
            room_id: row.room_id,
            mess_id: row.mess_id,
            assigned_hostel_id: row.assigned_hostel_id,
            assigned_floor: row.assigned_floor,
        })
    }
}

#[derive(FromRow)]
struct SessionRow {
    id: i32,
    token: String,
    user_id: i32,
    expires_at: DateTime<Utc>,
}

#[derive(FromRow)]
struct HostelRow {
    id: i32,
    name: String,
    block: String,
    gender: String,
    total_rooms: i32,
    total_capacity: i32,
    active: bool,
    facilities: Vec<String>,
    address: String,
}

impl TryFrom<HostelRow> for HostelData {
    type Error = DatabaseError;

    fn try_from(row: HostelRow) -> Result<Self> {
        Ok(Self {
            id: row.id,
            name: row.name,
            block: row.block,
            gender: parse(&row.gender)?,
            total_rooms: row.total_rooms,
            total_capacity: row.total_capacity,
            active: row.active,
            facilities: row.facilities,
            address: row.address,
        })
    }
}

#[derive(FromRow)]
struct RoomRow {
    id: i32,
    hostel_id: i32,
    floor: i32,
    room_number: String,
    room_type: String,
    capacity: i32,
    gender: String,
    has_ac: bool,
    fee_per_year: i64,
    facilities: Vec<String>,
    maintenance: String,
    warden_id: Option<i32>,
    occupants: Vec<i32>,
}

impl TryFrom<RoomRow> for RoomData {
    type Error = DatabaseError;

    fn try_from(row: RoomRow) -> Result<Self> {
        Ok(Self {
            id: row.id,
            hostel_id: row.hostel_id,
            floor: row.floor,
            room_number: row.room_number,
            room_type: parse(&row.room_type)?,
            capacity: row.capacity,
            gender: parse(&row.gender)?,
            has_ac: row.has_ac,
            fee_per_year: row.fee_per_year,
            facilities: row.facilities,
            maintenance: parse(&row.maintenance)?,
            occupants: row.occupants,
            warden_id: row.warden_id,
        })
    }
}

#[derive(FromRow)]
struct MessRow {
    id: i32,
    hostel_id: i32,
    name: String,
    capacity: i32,
    menu_type: String,
    facilities: Vec<String>,
    active: bool,
}

impl TryFrom<MessRow> for MessData {
    type Error = DatabaseError;

    fn try_from(row: MessRow) -> Result<Self> {
        Ok(Self {
            id: row.id,
            hostel_id: row.hostel_id,
            name: row.name,
            capacity: row.capacity,
            menu_type: parse(&row.menu_type)?,
            facilities: row.facilities,
            active: row.active,
        })
    }
}

#[derive(FromRow)]
struct HostelRequestRow {
    id: i32,
    student_id: i32,
    hostel_id: i32,
    room_type: String,
    ac_preference: String,
    gender: String,
    year: i32,
    floor_preference: Option<i32>,
    status: String,
    assigned_room_id: Option<i32>,
    approver_id: Option<i32>,
    remarks: Option<String>,
    created_at: DateTime<Utc>,
    decided_at: Option<DateTime<Utc>>,
}

impl TryFrom<HostelRequestRow> for HostelRequestData {
    type Error = DatabaseError;

    fn try_from(row: HostelRequestRow) -> Result<Self> {
        Ok(Self {
            id: row.id,
            student_id: row.student_id,
            hostel_id: row.hostel_id,
            room_type: parse(&row.room_type)?,
            ac_preference: parse(&row.ac_preference)?,
            gender: parse(&row.gender)?,
            year: StudyYear::try_from(row.year).map_err(|e| DatabaseError::Internal(Box::new(e)))?,
            floor_preference: row.floor_preference,
            status: parse(&row.status)?,
            assigned_room_id: row.assigned_room_id,
            approver_id: row.approver_id,
            remarks: row.remarks,
            created_at: row.created_at,
            decided_at: row.decided_at,
        })
    }
}

#[derive(FromRow)]
struct MessApplicationRow {
    id: i32,
    student_id: i32,
    hostel_id: i32,
    mess_id: i32,
    food_preference: String,
    status: String,
    approver_id: Option<i32>,
    remarks: Option<String>,
    created_at: DateTime<Utc>,
    decided_at: Option<DateTime<Utc>>,
}

impl TryFrom<MessApplicationRow> for MessApplicationData {
    type Error = DatabaseError;

    fn try_from(row: MessApplicationRow) -> Result<Self> {
        Ok(Self {
            id: row.id,
            student_id: row.student_id,
            hostel_id: row.hostel_id,
            mess_id: row.mess_id,
            food_preference: parse(&row.food_preference)?,
            status: parse(&row.status)?,
            approver_id: row.approver_id,
            remarks: row.remarks,
            created_at: row.created_at,
            decided_at: row.decided_at,
        })
    }
}

#[derive(FromRow)]
struct FeedbackRow {
    id: i32,
    student_id: i32,
    menu_item: Option<String>,
    rating: i32,
    comments: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<FeedbackRow> for MessFeedbackData {
    type Error = DatabaseError;

    fn try_from(row: FeedbackRow) -> Result<Self> {
        Ok(Self {
            id: row.id,
            student_id: row.student_id,
            menu_item: row.menu_item,
            rating: Rating::try_from(row.rating).map_err(|e| DatabaseError::Internal(Box::new(e)))?,
            comments: row.comments,
            created_at: row.created_at,
        })
    }
}

fn collect<R, T>(rows: Vec<R>) -> Result<Vec<T>>
where
    T: TryFrom<R, Error = DatabaseError>,
{
    rows.into_iter().map(T::try_from).collect()
}

#[async_trait]
impl Database for PgDatabase {
    async fn any_admin(&self) -> Result<bool> {
        let result = query("SELECT id FROM users WHERE role = 'admin'")
            .fetch_one(&self.pool)
            .await;

        match result {
            Ok(_) => Ok(true),
            Err(SqlxError::RowNotFound) => Ok(false),
            Err(e) => Err(e.any()),
        }
    }

    async fn user_by_id(&self, user_id: PrimaryKey) -> Result<UserData> {
        query_as::<_, UserRow>("SELECT * FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| e.not_found_or("user", "id"))?
            .try_into()
    }

    async fn user_by_username(&self, username: &str) -> Result<UserData> {
        query_as::<_, UserRow>("SELECT * FROM users WHERE username = $1")
            .bind(username)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| e.not_found_or("user", "username"))?
            .try_into()
    }

    async fn create_user(&self, new_user: NewUser) -> Result<UserData> {
        self.user_by_username(&new_user.username)
            .await
            .conflict_or_ok("user", "username", &new_user.username)?;

        if let Some(hostel_id) = new_user.assigned_hostel_id {
            self.hostel_by_id(hostel_id).await?;
        }

        query_as::<_, UserRow>(
            "
            INSERT INTO users
                (username, password, display_name, role, gender, hostel_identifier, assigned_hostel_id, assigned_floor)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *",
        )
        .bind(&new_user.username)
        .bind(&new_user.password)
        .bind(&new_user.display_name)
        .bind(new_user.role.as_str())
        .bind(new_user.gender.map(|g| g.as_str()))
        .bind(&new_user.hostel_identifier)
        .bind(new_user.assigned_hostel_id)
        .bind(new_user.assigned_floor)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| e.conflict_or("user", "username", &new_user.username))?
        .try_into()
    }

    async fn session_by_token(&self, token: &str) -> Result<SessionData> {
        let row = query_as::<_, SessionRow>("SELECT * FROM sessions WHERE token = $1")
            .bind(token)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| e.not_found_or("session", "token"))?;

        Ok(SessionData {
            id: row.id,
            token: row.token,
            expires_at: row.expires_at,
            user: self.user_by_id(row.user_id).await?,
        })
    }

    async fn create_session(&self, new_session: NewSession) -> Result<SessionData> {
        self.session_by_token(&new_session.token)
            .await
            .conflict_or_ok("session", "token", &new_session.token)?;

        query("INSERT INTO sessions (token, user_id, expires_at) VALUES ($1, $2, $3)")
            .bind(&new_session.token)
            .bind(new_session.user_id)
            .bind(new_session.expires_at)
            .execute(&self.pool)
            .await
            .map_err(|e| e.conflict_or("session", "token", &new_session.token))?;

        self.session_by_token(&new_session.token).await
    }

    async fn delete_session_by_token(&self, token: &str) -> Result<()> {
        // Ensure session exists
        let _ = self.session_by_token(token).await?;

        query("DELETE FROM sessions WHERE token = $1")
            .bind(token)
            .execute(&self.pool)
            .await
            .map_err(|e| e.any())
            .map(|_| ())
    }

    async fn clear_expired_sessions(&self) -> Result<()> {
        query("DELETE FROM sessions WHERE now() > expires_at")
            .execute(&self.pool)
            .await
            .map_err(|e| e.any())
            .map(|_| ())
    }

    async fn hostel_by_id(&self, hostel_id: PrimaryKey) -> Result<HostelData> {
        query_as::<_, HostelRow>("SELECT * FROM hostels WHERE id = $1")
            .bind(hostel_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| e.not_found_or("hostel", "id"))?
            .try_into()
    }

    async fn list_hostels(&self) -> Result<Vec<HostelData>> {
        let rows = query_as::<_, HostelRow>("SELECT * FROM hostels ORDER BY name")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| e.any())?;

        collect(rows)
    }

    async fn create_hostel(&self, new_hostel: NewHostel) -> Result<HostelData> {
        self.hostel_by_name(&new_hostel.name)
            .await
            .conflict_or_ok("hostel", "name", &new_hostel.name)?;

        query_as::<_, HostelRow>(
            "
            INSERT INTO hostels (name, block, gender, total_rooms, total_capacity, facilities, address)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *",
        )
        .bind(&new_hostel.name)
        .bind(&new_hostel.block)
        .bind(new_hostel.gender.as_str())
        .bind(new_hostel.total_rooms)
        .bind(new_hostel.total_capacity)
        .bind(&new_hostel.facilities)
        .bind(&new_hostel.address)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| e.conflict_or("hostel", "name", &new_hostel.name))?
        .try_into()
    }

    async fn update_hostel(&self, updated_hostel: UpdatedHostel) -> Result<HostelData> {
        let hostel = self.hostel_by_id(updated_hostel.id).await?;

        if let Some(name) = updated_hostel.name.as_deref().filter(|n| *n != hostel.name) {
            self.hostel_by_name(name)
                .await
                .conflict_or_ok("hostel", "name", name)?;
        }

        let name = updated_hostel.name.clone().unwrap_or(hostel.name);

        query_as::<_, HostelRow>(
            "UPDATE hostels SET
                name = COALESCE($2, name),
                block = COALESCE($3, block),
                total_rooms = COALESCE($4, total_rooms),
                total_capacity = COALESCE($5, total_capacity),
                active = COALESCE($6, active),
                facilities = COALESCE($7, facilities),
                address = COALESCE($8, address)
            WHERE id = $1
            RETURNING *",
        )
        .bind(updated_hostel.id)
        .bind(updated_hostel.name)
        .bind(updated_hostel.block)
        .bind(updated_hostel.total_rooms)
        .bind(updated_hostel.total_capacity)
        .bind(updated_hostel.active)
        .bind(updated_hostel.facilities)
        .bind(updated_hostel.address)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            SqlxError::RowNotFound => e.not_found_or("hostel", "id"),
            e => e.conflict_or("hostel", "name", &name),
        })?
        .try_into()
    }

    async fn delete_hostel(&self, hostel_id: PrimaryKey) -> Result<()> {
        // Ensure hostel exists
        let _ = self.hostel_by_id(hostel_id).await?;

        let (rooms, messes, requests, wardens) = query_as::<_, (bool, bool, bool, bool)>(
            "SELECT
                EXISTS (SELECT 1 FROM rooms WHERE hostel_id = $1),
                EXISTS (SELECT 1 FROM messes WHERE hostel_id = $1),
                EXISTS (SELECT 1 FROM hostel_requests WHERE hostel_id = $1)
                    OR EXISTS (SELECT 1 FROM mess_applications WHERE hostel_id = $1),
                EXISTS (SELECT 1 FROM users WHERE assigned_hostel_id = $1)",
        )
        .bind(hostel_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| e.any())?;

        let dependents = [
            (rooms, "rooms"),
            (messes, "messes"),
            (requests, "requests"),
            (wardens, "wardens"),
        ]
        .into_iter()
        .find_map(|(exists, name)| exists.then_some(name));

        if let Some(dependents) = dependents {
            return Err(DatabaseError::HasDependents {
                resource: "hostel",
                dependents,
            });
        }

        query("DELETE FROM hostels WHERE id = $1")
            .bind(hostel_id)
            .execute(&self.pool)
            .await
            .map_err(|e| e.any())
            .map(|_| ())
    }

    async fn room_by_id(&self, room_id: PrimaryKey) -> Result<RoomData> {
        query_as::<_, RoomRow>(&format!("{ROOM_SELECT} WHERE id = $1"))
            .bind(room_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| e.not_found_or("room", "id"))?
            .try_into()
    }

    async fn list_rooms(&self, hostel_id: PrimaryKey) -> Result<Vec<RoomData>> {
        // Ensure hostel exists
        let _ = self.hostel_by_id(hostel_id).await?;

        let rows = query_as::<_, RoomRow>(&format!(
            "{ROOM_SELECT} WHERE hostel_id = $1 {ROOM_ORDER}"
        ))
        .bind(hostel_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| e.any())?;

        collect(rows)
    }

    async fn available_rooms(&self, filter: RoomFilter) -> Result<Vec<RoomData>> {
        let rows = query_as::<_, RoomRow>(&format!(
            "{ROOM_SELECT}
            WHERE ($1::int IS NULL OR hostel_id = $1)
                AND ($2::text IS NULL OR room_type = $2)
                AND ($3::bool IS NULL OR has_ac = $3)
                AND ($4::text IS NULL OR gender = $4)
                AND capacity > (
                    SELECT count(*) FROM room_occupants
                    WHERE room_occupants.room_id = rooms.id
                )
            {ROOM_ORDER}"
        ))
        .bind(filter.hostel_id)
        .bind(filter.room_type.map(|t| t.as_str()))
        .bind(filter.has_ac)
        .bind(filter.gender.map(|g| g.as_str()))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| e.any())?;

        collect(rows)
    }

    async fn create_room(&self, new_room: NewRoom) -> Result<RoomData> {
        // Ensure hostel exists
        let _ = self.hostel_by_id(new_room.hostel_id).await?;

        query(
            "SELECT id FROM rooms WHERE hostel_id = $1 AND floor = $2 AND room_number = $3",
        )
        .bind(new_room.hostel_id)
        .bind(new_room.floor)
        .bind(&new_room.room_number)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| e.not_found_or("", ""))
        .conflict_or_ok(
            "room",
            "hostel:floor:room_number",
            format!(
                "{}:{}:{}",
                new_room.hostel_id, new_room.floor, new_room.room_number
            )
            .as_str(),
        )?;

        let (room_id,) = query_as::<_, (i32,)>(
            "
            INSERT INTO rooms
                (hostel_id, floor, room_number, room_type, capacity, gender, has_ac, fee_per_year, facilities, warden_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING id",
        )
        .bind(new_room.hostel_id)
        .bind(new_room.floor)
        .bind(&new_room.room_number)
        .bind(new_room.room_type.as_str())
        .bind(new_room.capacity)
        .bind(new_room.gender.as_str())
        .bind(new_room.has_ac)
        .bind(new_room.fee_per_year)
        .bind(&new_room.facilities)
        .bind(new_room.warden_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            e.conflict_or(
                "room",
                "hostel:floor:room_number",
                &format!(
                    "{}:{}:{}",
                    new_room.hostel_id, new_room.floor, new_room.room_number
                ),
            )
        })?;

        self.room_by_id(room_id).await
    }

    async fn update_room(&self, updated_room: UpdatedRoom) -> Result<Commit<RoomData>> {
        let mut tx = self.pool.begin().await.map_err(|e| e.any())?;

        // Placements into this room wait until the resize commits
        query("SELECT id FROM rooms WHERE id = $1 FOR UPDATE")
            .bind(updated_room.id)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| e.not_found_or("room", "id"))?;

        if let Some(capacity) = updated_room.capacity {
            let (occupied,) =
                query_as::<_, (i64,)>("SELECT count(*) FROM room_occupants WHERE room_id = $1")
                    .bind(updated_room.id)
                    .fetch_one(&mut *tx)
                    .await
                    .map_err(|e| e.any())?;

            if occupied > capacity as i64 {
                return Ok(Commit::BelowOccupancy {
                    occupied: occupied as i32,
                });
            }
        }

        query(
            "UPDATE rooms SET
                capacity = COALESCE($2, capacity),
                has_ac = COALESCE($3, has_ac),
                fee_per_year = COALESCE($4, fee_per_year),
                facilities = COALESCE($5, facilities),
                maintenance = COALESCE($6, maintenance),
                warden_id = COALESCE($7, warden_id)
            WHERE id = $1",
        )
        .bind(updated_room.id)
        .bind(updated_room.capacity)
        .bind(updated_room.has_ac)
        .bind(updated_room.fee_per_year)
        .bind(updated_room.facilities)
        .bind(updated_room.maintenance.map(|m| m.as_str()))
        .bind(updated_room.warden_id)
        .execute(&mut *tx)
        .await
        .map_err(|e| e.any())?;

        tx.commit().await.map_err(|e| e.any())?;

        Ok(Commit::Done(self.room_by_id(updated_room.id).await?))
    }

    async fn delete_room(&self, room_id: PrimaryKey) -> Result<()> {
        let room = self.room_by_id(room_id).await?;

        if !room.occupants.is_empty() {
            return Err(DatabaseError::HasDependents {
                resource: "room",
                dependents: "occupants",
            });
        }

        query("DELETE FROM rooms WHERE id = $1")
            .bind(room_id)
            .execute(&self.pool)
            .await
            .map_err(|e| e.any())
            .map(|_| ())
    }

    async fn release_student(&self, student_id: PrimaryKey) -> Result<RoomData> {
        let mut tx = self.pool.begin().await.map_err(|e| e.any())?;

        let (room_id,) = query_as::<_, (i32,)>(
            "DELETE FROM room_occupants WHERE student_id = $1 RETURNING room_id",
        )
        .bind(student_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| e.not_found_or("room", "student_id"))?;

        query("UPDATE users SET room_id = NULL WHERE id = $1")
            .bind(student_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| e.any())?;

        tx.commit().await.map_err(|e| e.any())?;

        self.room_by_id(room_id).await
    }

    async fn mess_by_id(&self, mess_id: PrimaryKey) -> Result<MessData> {
        query_as::<_, MessRow>("SELECT * FROM messes WHERE id = $1")
            .bind(mess_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| e.not_found_or("mess", "id"))?
            .try_into()
    }

    async fn list_messes(&self, hostel_id: PrimaryKey) -> Result<Vec<MessData>> {
        // Ensure hostel exists
        let _ = self.hostel_by_id(hostel_id).await?;

        let rows = query_as::<_, MessRow>("SELECT * FROM messes WHERE hostel_id = $1 ORDER BY id")
            .bind(hostel_id)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| e.any())?;

        collect(rows)
    }

    async fn create_mess(&self, new_mess: NewMess) -> Result<MessData> {
        // Ensure hostel exists
        let _ = self.hostel_by_id(new_mess.hostel_id).await?;

        query_as::<_, MessRow>(
            "
            INSERT INTO messes (hostel_id, name, capacity, menu_type, facilities)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *",
        )
        .bind(new_mess.hostel_id)
        .bind(&new_mess.name)
        .bind(new_mess.capacity)
        .bind(new_mess.menu_type.as_str())
        .bind(&new_mess.facilities)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| e.any())?
        .try_into()
    }

    async fn update_mess(&self, updated_mess: UpdatedMess) -> Result<MessData> {
        query_as::<_, MessRow>(
            "UPDATE messes SET
                name = COALESCE($2, name),
                capacity = COALESCE($3, capacity),
                menu_type = COALESCE($4, menu_type),
                facilities = COALESCE($5, facilities),
                active = COALESCE($6, active)
            WHERE id = $1
            RETURNING *",
        )
        .bind(updated_mess.id)
        .bind(updated_mess.name)
        .bind(updated_mess.capacity)
        .bind(updated_mess.menu_type.map(|m| m.as_str()))
        .bind(updated_mess.facilities)
        .bind(updated_mess.active)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| e.not_found_or("mess", "id"))?
        .try_into()
    }

    async fn delete_mess(&self, mess_id: PrimaryKey) -> Result<()> {
        // Ensure mess exists
        let _ = self.mess_by_id(mess_id).await?;

        let (referenced,) = query_as::<_, (bool,)>(
            "SELECT
                EXISTS (SELECT 1 FROM users WHERE mess_id = $1)
                OR EXISTS (SELECT 1 FROM mess_applications WHERE mess_id = $1)",
        )
        .bind(mess_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| e.any())?;

        if referenced {
            return Err(DatabaseError::HasDependents {
                resource: "mess",
                dependents: "applications",
            });
        }

        query("DELETE FROM messes WHERE id = $1")
            .bind(mess_id)
            .execute(&self.pool)
            .await
            .map_err(|e| e.any())
            .map(|_| ())
    }

    async fn hostel_request_by_id(&self, request_id: PrimaryKey) -> Result<HostelRequestData> {
        query_as::<_, HostelRequestRow>("SELECT * FROM hostel_requests WHERE id = $1")
            .bind(request_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| e.not_found_or("hostel request", "id"))?
            .try_into()
    }

    async fn list_hostel_requests(
        &self,
        filter: RequestFilter,
    ) -> Result<Vec<HostelRequestData>> {
        let rows = query_as::<_, HostelRequestRow>(
            "SELECT * FROM hostel_requests
            WHERE ($1::int IS NULL OR student_id = $1)
                AND ($2::int IS NULL OR hostel_id = $2)
                AND ($3::text IS NULL OR status = $3)
            ORDER BY created_at, id",
        )
        .bind(filter.student_id)
        .bind(filter.hostel_id)
        .bind(filter.status.map(|s| s.as_str()))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| e.any())?;

        collect(rows)
    }

    async fn create_hostel_request(
        &self,
        new_request: NewHostelRequest,
    ) -> Result<HostelRequestData> {
        // Ensure student and hostel exist
        let _ = self.user_by_id(new_request.student_id).await?;
        let _ = self.hostel_by_id(new_request.hostel_id).await?;

        query_as::<_, HostelRequestRow>(
            "
            INSERT INTO hostel_requests
                (student_id, hostel_id, room_type, ac_preference, gender, year, floor_preference)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *",
        )
        .bind(new_request.student_id)
        .bind(new_request.hostel_id)
        .bind(new_request.room_type.as_str())
        .bind(new_request.ac_preference.as_str())
        .bind(new_request.gender.as_str())
        .bind(new_request.year.value())
        .bind(new_request.floor_preference)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| e.any())?
        .try_into()
    }

    async fn place_student(&self, placement: Placement) -> Result<Commit<HostelRequestData>> {
        let mut tx = self.pool.begin().await.map_err(|e| e.any())?;

        let request: HostelRequestData = query_as::<_, HostelRequestRow>(
            "SELECT * FROM hostel_requests WHERE id = $1 FOR UPDATE",
        )
        .bind(placement.request_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| e.not_found_or("hostel request", "id"))?
        .try_into()?;

        if request.status.is_terminal() {
            return Ok(Commit::AlreadyDecided(request.status));
        }

        // Concurrent placements into the same room queue up behind this lock
        let (capacity, gender, room_type, has_ac) = query_as::<_, (i32, String, String, bool)>(
            "SELECT capacity, gender, room_type, has_ac FROM rooms WHERE id = $1 FOR UPDATE",
        )
        .bind(placement.room_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| e.not_found_or("room", "id"))?;

        if parse::<Gender>(&gender)? != request.gender {
            return Ok(Commit::Mismatch(Mismatch::Gender));
        }

        if parse::<RoomType>(&room_type)? != request.room_type {
            return Ok(Commit::Mismatch(Mismatch::RoomType));
        }

        if has_ac != request.ac_preference.has_ac() {
            return Ok(Commit::Mismatch(Mismatch::AirConditioning));
        }

        let (current_room,) =
            query_as::<_, (Option<i32>,)>("SELECT room_id FROM users WHERE id = $1 FOR UPDATE")
                .bind(request.student_id)
                .fetch_one(&mut *tx)
                .await
                .map_err(|e| e.not_found_or("user", "id"))?;

        if current_room.is_some() {
            return Ok(Commit::AlreadyPlaced);
        }

        let (occupied,) =
            query_as::<_, (i64,)>("SELECT count(*) FROM room_occupants WHERE room_id = $1")
                .bind(placement.room_id)
                .fetch_one(&mut *tx)
                .await
                .map_err(|e| e.any())?;

        if occupied >= capacity as i64 {
            return Ok(Commit::Full);
        }

        query("INSERT INTO room_occupants (room_id, student_id) VALUES ($1, $2)")
            .bind(placement.room_id)
            .bind(request.student_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| e.any())?;

        query("UPDATE users SET room_id = $1 WHERE id = $2")
            .bind(placement.room_id)
            .bind(request.student_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| e.any())?;

        let approved: HostelRequestData = query_as::<_, HostelRequestRow>(
            "UPDATE hostel_requests SET
                status = 'approved',
                assigned_room_id = $2,
                approver_id = $3,
                remarks = $4,
                decided_at = now()
            WHERE id = $1
            RETURNING *",
        )
        .bind(placement.request_id)
        .bind(placement.room_id)
        .bind(placement.approver_id)
        .bind(placement.remarks)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| e.any())?
        .try_into()?;

        tx.commit().await.map_err(|e| e.any())?;

        Ok(Commit::Done(approved))
    }

    async fn reject_hostel_request(
        &self,
        verdict: Verdict,
    ) -> Result<Commit<HostelRequestData>> {
        let rejected = query_as::<_, HostelRequestRow>(
            "UPDATE hostel_requests SET
                status = 'rejected',
                approver_id = $2,
                remarks = $3,
                decided_at = now()
            WHERE id = $1 AND status = 'pending'
            RETURNING *",
        )
        .bind(verdict.id)
        .bind(verdict.approver_id)
        .bind(verdict.remarks)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| e.any())?;

        match rejected {
            Some(row) => Ok(Commit::Done(row.try_into()?)),
            None => {
                let request = self.hostel_request_by_id(verdict.id).await?;
                Ok(Commit::AlreadyDecided(request.status))
            }
        }
    }

    async fn mess_application_by_id(
        &self,
        application_id: PrimaryKey,
    ) -> Result<MessApplicationData> {
        query_as::<_, MessApplicationRow>("SELECT * FROM mess_applications WHERE id = $1")
            .bind(application_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| e.not_found_or("mess application", "id"))?
            .try_into()
    }

    async fn list_mess_applications(
        &self,
        filter: RequestFilter,
    ) -> Result<Vec<MessApplicationData>> {
        let rows = query_as::<_, MessApplicationRow>(
            "SELECT * FROM mess_applications
            WHERE ($1::int IS NULL OR student_id = $1)
                AND ($2::int IS NULL OR hostel_id = $2)
                AND ($3::text IS NULL OR status = $3)
            ORDER BY created_at, id",
        )
        .bind(filter.student_id)
        .bind(filter.hostel_id)
        .bind(filter.status.map(|s| s.as_str()))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| e.any())?;

        collect(rows)
    }

    async fn create_mess_application(
        &self,
        new_application: NewMessApplication,
    ) -> Result<MessApplicationData> {
        // Ensure student, hostel and mess exist
        let _ = self.user_by_id(new_application.student_id).await?;
        let _ = self.hostel_by_id(new_application.hostel_id).await?;
        let _ = self.mess_by_id(new_application.mess_id).await?;

        query_as::<_, MessApplicationRow>(
            "
            INSERT INTO mess_applications (student_id, hostel_id, mess_id, food_preference)
            VALUES ($1, $2, $3, $4)
            RETURNING *",
        )
        .bind(new_application.student_id)
        .bind(new_application.hostel_id)
        .bind(new_application.mess_id)
        .bind(new_application.food_preference.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| e.any())?
        .try_into()
    }

    async fn enroll_student(
        &self,
        verdict: Verdict,
        enforce_capacity: bool,
    ) -> Result<Commit<MessApplicationData>> {
        let mut tx = self.pool.begin().await.map_err(|e| e.any())?;

        let application: MessApplicationData = query_as::<_, MessApplicationRow>(
            "SELECT * FROM mess_applications WHERE id = $1 FOR UPDATE",
        )
        .bind(verdict.id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| e.not_found_or("mess application", "id"))?
        .try_into()?;

        if application.status.is_terminal() {
            return Ok(Commit::AlreadyDecided(application.status));
        }

        let (capacity, active, menu_type) = query_as::<_, (i32, bool, String)>(
            "SELECT capacity, active, menu_type FROM messes WHERE id = $1 FOR UPDATE",
        )
        .bind(application.mess_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| e.not_found_or("mess", "id"))?;

        if !active {
            return Ok(Commit::Mismatch(Mismatch::InactiveMess));
        }

        if !application
            .food_preference
            .compatible_with(parse::<MenuType>(&menu_type)?)
        {
            return Ok(Commit::Mismatch(Mismatch::Menu));
        }

        if enforce_capacity {
            let (members,) = query_as::<_, (i64,)>(
                "SELECT count(*) FROM users WHERE mess_id = $1 AND id <> $2",
            )
            .bind(application.mess_id)
            .bind(application.student_id)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| e.any())?;

            if members >= capacity as i64 {
                return Ok(Commit::Full);
            }
        }

        query("UPDATE users SET mess_id = $1 WHERE id = $2")
            .bind(application.mess_id)
            .bind(application.student_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| e.any())?;

        let approved: MessApplicationData = query_as::<_, MessApplicationRow>(
            "UPDATE mess_applications SET
                status = 'approved',
                approver_id = $2,
                remarks = $3,
                decided_at = now()
            WHERE id = $1
            RETURNING *",
        )
        .bind(verdict.id)
        .bind(verdict.approver_id)
        .bind(verdict.remarks)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| e.any())?
        .try_into()?;

        tx.commit().await.map_err(|e| e.any())?;

        Ok(Commit::Done(approved))
    }

    async fn reject_mess_application(
        &self,
        verdict: Verdict,
    ) -> Result<Commit<MessApplicationData>> {
        let rejected = query_as::<_, MessApplicationRow>(
            "UPDATE mess_applications SET
                status = 'rejected',
                approver_id = $2,
                remarks = $3,
                decided_at = now()
            WHERE id = $1 AND status = 'pending'
            RETURNING *",
        )
        .bind(verdict.id)
        .bind(verdict.approver_id)
        .bind(verdict.remarks)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| e.any())?;

        match rejected {
            Some(row) => Ok(Commit::Done(row.try_into()?)),
            None => {
                let application = self.mess_application_by_id(verdict.id).await?;
                Ok(Commit::AlreadyDecided(application.status))
            }
        }
    }

    async fn create_feedback(&self, new_feedback: NewFeedback) -> Result<MessFeedbackData> {
        query_as::<_, FeedbackRow>(
            "
            INSERT INTO mess_feedback (student_id, menu_item, rating, comments)
            VALUES ($1, $2, $3, $4)
            RETURNING *",
        )
        .bind(new_feedback.student_id)
        .bind(&new_feedback.menu_item)
        .bind(new_feedback.rating.value())
        .bind(&new_feedback.comments)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| e.any())?
        .try_into()
    }

    async fn list_feedback(&self) -> Result<Vec<MessFeedbackData>> {
        let rows = query_as::<_, FeedbackRow>("SELECT * FROM mess_feedback ORDER BY created_at, id")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| e.any())?;

        collect(rows)
    }
}

impl IntoDatabaseError for SqlxError {
    fn any(self) -> DatabaseError {
        DatabaseError::Internal(Box::new(self))
    }

    fn not_found_or(self, resource: &'static str, identifier: &'static str) -> DatabaseError {
        match self {
            SqlxError::RowNotFound => DatabaseError::NotFound {
                resource,
                identifier,
            },
            e => Self::any(e),
        }
    }

    fn conflict_or(
        self,
        resource: &'static str,
        field: &'static str,
        value: &str,
    ) -> DatabaseError {
        match self {
            SqlxError::Database(e) if e.is_unique_violation() => DatabaseError::Conflict {
                resource,
                field,
                value: value.to_string(),
            },
            e => Self::any(e),
        }
    }
}

#[cfg(test)]
mod test {
    use std::error::Error as StdError;

    use sqlx::error::{DatabaseError as SqlxDatabaseError, ErrorKind};
    use thiserror::Error;

    use super::SqlxError;
    use crate::{DatabaseError, IntoDatabaseError};

    #[derive(Debug, Error)]
    #[error("constraint failed")]
    struct ConstraintFailed {
        unique: bool,
    }

    impl SqlxDatabaseError for ConstraintFailed {
        fn message(&self) -> &str {
            "constraint failed"
        }

        fn as_error(&self) -> &(dyn StdError + Send + Sync + 'static) {
            self
        }

        fn as_error_mut(&mut self) -> &mut (dyn StdError + Send + Sync + 'static) {
            self
        }

        fn into_error(self: Box<Self>) -> Box<dyn StdError + Send + Sync + 'static> {
            self
        }

        fn kind(&self) -> ErrorKind {
            if self.unique {
                ErrorKind::UniqueViolation
            } else {
                ErrorKind::CheckViolation
            }
        }
    }

    #[test]
    fn unique_violations_become_conflicts() {
        let error = SqlxError::Database(Box::new(ConstraintFailed { unique: true }));

        match error.conflict_or("hostel", "name", "Aravali") {
            DatabaseError::Conflict {
                resource,
                field,
                value,
            } => {
                assert_eq!((resource, field), ("hostel", "name"));
                assert_eq!(value, "Aravali");
            }
            other => panic!("unexpected error {other}"),
        }
    }

    #[test]
    fn other_failures_stay_internal() {
        let error = SqlxError::Database(Box::new(ConstraintFailed { unique: false }));
        assert!(matches!(
            error.conflict_or("hostel", "name", "Aravali"),
            DatabaseError::Internal(_)
        ));

        assert!(matches!(
            SqlxError::RowNotFound.conflict_or("hostel", "name", "Aravali"),
            DatabaseError::Internal(_)
        ));
    }
}
