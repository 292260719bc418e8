use log::info;
use shams_core::{Gender, MaintenanceStatus, Occupancy, RoomType};

use crate::{
    access::require_admin,
    error::{check_optional_text, check_text},
    CollabContext, Commit, HostelData, MessData, NewHostel, NewMess, NewRoom, PrimaryKey, RoomData,
    UpdatedHostel, UpdatedMess, UpdatedRoom, UserData, WorkflowError, WorkflowResult,
};

const NAME_LENGTH: usize = 128;
const ADDRESS_LENGTH: usize = 512;

/// Administration of hostels, their rooms, and their messes.
/// Reads are open to everyone, writes need an admin.
pub struct HostelManager {
    context: CollabContext,
}

/// A room as an admin describes it. Capacity falls back to the room type's.
#[derive(Debug, Clone)]
pub struct RoomDraft {
    pub hostel_id: PrimaryKey,
    pub floor: i32,
    pub room_number: String,
    pub room_type: RoomType,
    pub capacity: Option<i32>,
    pub gender: Gender,
    pub has_ac: bool,
    pub fee_per_year: i64,
    pub facilities: Vec<String>,
    pub warden_id: Option<PrimaryKey>,
}

#[derive(Debug, Default)]
pub struct RoomChanges {
    pub capacity: Option<i32>,
    pub has_ac: Option<bool>,
    pub fee_per_year: Option<i64>,
    pub facilities: Option<Vec<String>>,
    pub maintenance: Option<MaintenanceStatus>,
    pub warden_id: Option<PrimaryKey>,
}

impl HostelManager {
    pub fn new(context: &CollabContext) -> Self {
        Self {
            context: context.clone(),
        }
    }

    pub async fn hostel(&self, hostel_id: PrimaryKey) -> WorkflowResult<HostelData> {
        Ok(self.context.database.hostel_by_id(hostel_id).await?)
    }

    pub async fn list_hostels(&self) -> WorkflowResult<Vec<HostelData>> {
        Ok(self.context.database.list_hostels().await?)
    }

    pub async fn create_hostel(
        &self,
        actor: &UserData,
        new_hostel: NewHostel,
    ) -> WorkflowResult<HostelData> {
        require_admin(actor)?;

        check_text("name", &new_hostel.name, NAME_LENGTH)?;
        check_text("block", &new_hostel.block, NAME_LENGTH)?;
        check_text("address", &new_hostel.address, ADDRESS_LENGTH)?;
        check_totals(Some(new_hostel.total_rooms), Some(new_hostel.total_capacity))?;

        let hostel = self.context.database.create_hostel(new_hostel).await?;

        info!(
            "Hostel {} ({}) created by {}",
            hostel.name, hostel.gender, actor.username
        );
        Ok(hostel)
    }

    pub async fn update_hostel(
        &self,
        actor: &UserData,
        updated: UpdatedHostel,
    ) -> WorkflowResult<HostelData> {
        require_admin(actor)?;

        check_optional_text("name", updated.name.as_deref(), NAME_LENGTH)?;
        check_optional_text("block", updated.block.as_deref(), NAME_LENGTH)?;
        check_optional_text("address", updated.address.as_deref(), ADDRESS_LENGTH)?;
        check_totals(updated.total_rooms, updated.total_capacity)?;

        let hostel = self.context.database.update_hostel(updated).await?;

        info!("Hostel {} updated by {}", hostel.name, actor.username);
        Ok(hostel)
    }

    /// Only hostels without rooms, messes, requests, or wardens can go
    pub async fn delete_hostel(&self, actor: &UserData, hostel_id: PrimaryKey) -> WorkflowResult<()> {
        require_admin(actor)?;

        self.context.database.delete_hostel(hostel_id).await?;

        info!("Hostel {} deleted by {}", hostel_id, actor.username);
        Ok(())
    }

    pub async fn room(&self, room_id: PrimaryKey) -> WorkflowResult<RoomData> {
        Ok(self.context.database.room_by_id(room_id).await?)
    }

    /// Rooms of a hostel, by floor then room number
    pub async fn list_rooms(&self, hostel_id: PrimaryKey) -> WorkflowResult<Vec<RoomData>> {
        // Unknown hostels are an error, not an empty list
        self.context.database.hostel_by_id(hostel_id).await?;
        Ok(self.context.database.list_rooms(hostel_id).await?)
    }

    pub async fn create_room(&self, actor: &UserData, draft: RoomDraft) -> WorkflowResult<RoomData> {
        require_admin(actor)?;

        check_text("room number", &draft.room_number, 16)?;
        check_floor(draft.floor)?;
        check_fee(draft.fee_per_year)?;

        let capacity = Occupancy::check_capacity(
            draft.capacity.unwrap_or_else(|| draft.room_type.capacity()),
        )?;

        let hostel = self.context.database.hostel_by_id(draft.hostel_id).await?;

        if !hostel.gender.admits(draft.gender) {
            return Err(WorkflowError::ConstraintViolation(format!(
                "a {} room cannot be added to {} hostel {}",
                draft.gender, hostel.gender, hostel.name
            )));
        }

        if let Some(warden_id) = draft.warden_id {
            self.context.database.user_by_id(warden_id).await?;
        }

        let room = self
            .context
            .database
            .create_room(NewRoom {
                hostel_id: draft.hostel_id,
                floor: draft.floor,
                room_number: draft.room_number,
                room_type: draft.room_type,
                capacity,
                gender: draft.gender,
                has_ac: draft.has_ac,
                fee_per_year: draft.fee_per_year,
                facilities: draft.facilities,
                warden_id: draft.warden_id,
            })
            .await?;

        info!(
            "Room {} on floor {} of {} created with {} beds",
            room.room_number, room.floor, hostel.name, room.capacity
        );
        Ok(room)
    }

    /// Capacity may not drop below the number of students living in the room
    pub async fn update_room(
        &self,
        actor: &UserData,
        room_id: PrimaryKey,
        changes: RoomChanges,
    ) -> WorkflowResult<RoomData> {
        require_admin(actor)?;

        if let Some(fee) = changes.fee_per_year {
            check_fee(fee)?;
        }

        if let Some(capacity) = changes.capacity {
            Occupancy::check_capacity(capacity)?;
        }

        // Occupancy is checked under the room's lock, against the placements committed so far
        let commit = self
            .context
            .database
            .update_room(UpdatedRoom {
                id: room_id,
                capacity: changes.capacity,
                has_ac: changes.has_ac,
                fee_per_year: changes.fee_per_year,
                facilities: changes.facilities,
                maintenance: changes.maintenance,
                warden_id: changes.warden_id,
            })
            .await?;

        let room = match commit {
            Commit::Done(room) => room,
            Commit::BelowOccupancy { occupied } => {
                return Err(WorkflowError::Validation(format!(
                    "capacity must be at least {occupied}, the room has {occupied} students"
                )))
            }
            _ => {
                return Err(WorkflowError::ConstraintViolation(format!(
                    "room {room_id} cannot be changed right now"
                )))
            }
        };

        info!("Room {} updated by {}", room.id, actor.username);
        Ok(room)
    }

    /// Occupied rooms can't be deleted
    pub async fn delete_room(&self, actor: &UserData, room_id: PrimaryKey) -> WorkflowResult<()> {
        require_admin(actor)?;

        self.context.database.delete_room(room_id).await?;

        info!("Room {} deleted by {}", room_id, actor.username);
        Ok(())
    }

    pub async fn mess(&self, mess_id: PrimaryKey) -> WorkflowResult<MessData> {
        Ok(self.context.database.mess_by_id(mess_id).await?)
    }

    pub async fn list_messes(&self, hostel_id: PrimaryKey) -> WorkflowResult<Vec<MessData>> {
        self.context.database.hostel_by_id(hostel_id).await?;
        Ok(self.context.database.list_messes(hostel_id).await?)
    }

    pub async fn create_mess(&self, actor: &UserData, new_mess: NewMess) -> WorkflowResult<MessData> {
        require_admin(actor)?;

        check_text("name", &new_mess.name, NAME_LENGTH)?;
        Occupancy::check_capacity(new_mess.capacity)?;
        self.context.database.hostel_by_id(new_mess.hostel_id).await?;

        let mess = self.context.database.create_mess(new_mess).await?;

        info!(
            "Mess {} ({}) created for hostel {}",
            mess.name, mess.menu_type, mess.hostel_id
        );
        Ok(mess)
    }

    pub async fn update_mess(
        &self,
        actor: &UserData,
        updated: UpdatedMess,
    ) -> WorkflowResult<MessData> {
        require_admin(actor)?;

        check_optional_text("name", updated.name.as_deref(), NAME_LENGTH)?;
        if let Some(capacity) = updated.capacity {
            Occupancy::check_capacity(capacity)?;
        }

        let mess = self.context.database.update_mess(updated).await?;

        info!("Mess {} updated by {}", mess.name, actor.username);
        Ok(mess)
    }

    pub async fn delete_mess(&self, actor: &UserData, mess_id: PrimaryKey) -> WorkflowResult<()> {
        require_admin(actor)?;

        self.context.database.delete_mess(mess_id).await?;

        info!("Mess {} deleted by {}", mess_id, actor.username);
        Ok(())
    }
}

fn check_totals(total_rooms: Option<i32>, total_capacity: Option<i32>) -> WorkflowResult<()> {
    let negative = total_rooms.is_some_and(|n| n < 0) || total_capacity.is_some_and(|n| n < 0);

    if negative {
        return Err(WorkflowError::Validation(
            "room and capacity totals cannot be negative".to_string(),
        ));
    }

    Ok(())
}

fn check_floor(floor: i32) -> WorkflowResult<()> {
    if !(0..=200).contains(&floor) {
        return Err(WorkflowError::Validation(format!(
            "floor must be between 0 and 200, got {floor}"
        )));
    }

    Ok(())
}

fn check_fee(fee: i64) -> WorkflowResult<()> {
    if fee < 0 {
        return Err(WorkflowError::Validation(
            "fee cannot be negative".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
pub(crate) mod test {
    use std::sync::Arc;

    use shams_core::{Config, Gender, HostelGender, Role, RoomType};

    use super::{HostelManager, RoomChanges, RoomDraft};
    use crate::{
        access::test::user, CollabContext, HostelData, MemoryDatabase, NewHostel, Notifier, SharedDatabase, WorkflowError,
    };

    pub fn context() -> CollabContext {
        let database: SharedDatabase = Arc::new(MemoryDatabase::new());
        let (notifier, _) = Notifier::channel();

        CollabContext {
            database,
            config: Config::default(),
            notifier,
        }
    }

    pub fn new_hostel(name: &str, gender: HostelGender) -> NewHostel {
        NewHostel {
            name: name.to_string(),
            block: "A".to_string(),
            gender,
            total_rooms: 0,
            total_capacity: 0,
            facilities: vec!["wifi".to_string()],
            address: "Campus road".to_string(),
        }
    }

    pub fn draft(hostel: &HostelData, room_number: &str, room_type: RoomType) -> RoomDraft {
        RoomDraft {
            hostel_id: hostel.id,
            floor: 1,
            room_number: room_number.to_string(),
            room_type,
            capacity: None,
            gender: Gender::Male,
            has_ac: false,
            fee_per_year: 40_000,
            facilities: vec![],
            warden_id: None,
        }
    }

    #[tokio::test]
    async fn capacity_defaults_to_room_type() {
        let manager = HostelManager::new(&context());
        let admin = user(1, Role::Admin);

        let hostel = manager
            .create_hostel(&admin, new_hostel("Aravali", HostelGender::Male))
            .await
            .unwrap();

        let triple = manager
            .create_room(&admin, draft(&hostel, "101", RoomType::Triple))
            .await
            .unwrap();
        assert_eq!(triple.capacity, 3);

        let custom = manager
            .create_room(
                &admin,
                RoomDraft {
                    capacity: Some(2),
                    ..draft(&hostel, "102", RoomType::Triple)
                },
            )
            .await
            .unwrap();
        assert_eq!(custom.capacity, 2);
    }

    #[tokio::test]
    async fn zero_capacity_is_refused() {
        let manager = HostelManager::new(&context());
        let admin = user(1, Role::Admin);

        let hostel = manager
            .create_hostel(&admin, new_hostel("Aravali", HostelGender::Male))
            .await
            .unwrap();

        let result = manager
            .create_room(
                &admin,
                RoomDraft {
                    capacity: Some(0),
                    ..draft(&hostel, "101", RoomType::Single)
                },
            )
            .await;

        assert!(matches!(result, Err(WorkflowError::Validation(_))));
    }

    #[tokio::test]
    async fn room_gender_must_fit_the_hostel() {
        let manager = HostelManager::new(&context());
        let admin = user(1, Role::Admin);

        let hostel = manager
            .create_hostel(&admin, new_hostel("Nilgiri", HostelGender::Female))
            .await
            .unwrap();

        let result = manager
            .create_room(&admin, draft(&hostel, "101", RoomType::Double))
            .await;

        assert!(matches!(
            result,
            Err(WorkflowError::ConstraintViolation(_))
        ));
    }

    #[tokio::test]
    async fn room_numbers_are_unique_per_floor() {
        let manager = HostelManager::new(&context());
        let admin = user(1, Role::Admin);

        let hostel = manager
            .create_hostel(&admin, new_hostel("Aravali", HostelGender::Coed))
            .await
            .unwrap();

        manager
            .create_room(&admin, draft(&hostel, "101", RoomType::Double))
            .await
            .unwrap();

        let duplicate = manager
            .create_room(&admin, draft(&hostel, "101", RoomType::Single))
            .await;
        assert!(matches!(duplicate, Err(WorkflowError::Conflict { .. })));

        let other_floor = manager
            .create_room(
                &admin,
                RoomDraft {
                    floor: 2,
                    ..draft(&hostel, "101", RoomType::Single)
                },
            )
            .await;
        assert!(other_floor.is_ok());
    }

    #[tokio::test]
    async fn rooms_are_listed_by_floor_then_number() {
        let manager = HostelManager::new(&context());
        let admin = user(1, Role::Admin);

        let hostel = manager
            .create_hostel(&admin, new_hostel("Aravali", HostelGender::Male))
            .await
            .unwrap();

        for (floor, number) in [(2, "201"), (1, "110"), (1, "109"), (1, "9")] {
            manager
                .create_room(
                    &admin,
                    RoomDraft {
                        floor,
                        ..draft(&hostel, number, RoomType::Single)
                    },
                )
                .await
                .unwrap();
        }

        let numbers: Vec<_> = manager
            .list_rooms(hostel.id)
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.room_number)
            .collect();

        assert_eq!(numbers, ["9", "109", "110", "201"]);
    }

    #[tokio::test]
    async fn only_admins_manage_hostels() {
        let manager = HostelManager::new(&context());

        let result = manager
            .create_hostel(
                &user(2, Role::Warden),
                new_hostel("Aravali", HostelGender::Male),
            )
            .await;

        assert!(matches!(result, Err(WorkflowError::Forbidden(_))));
    }

    #[tokio::test]
    async fn hostels_with_rooms_cannot_be_deleted() {
        let manager = HostelManager::new(&context());
        let admin = user(1, Role::Admin);

        let hostel = manager
            .create_hostel(&admin, new_hostel("Aravali", HostelGender::Male))
            .await
            .unwrap();
        let room = manager
            .create_room(&admin, draft(&hostel, "101", RoomType::Single))
            .await
            .unwrap();

        let blocked = manager.delete_hostel(&admin, hostel.id).await;
        assert!(matches!(blocked, Err(WorkflowError::HasDependents { .. })));

        manager.delete_room(&admin, room.id).await.unwrap();
        manager.delete_hostel(&admin, hostel.id).await.unwrap();
        assert!(manager.hostel(hostel.id).await.is_err());
    }

    #[tokio::test]
    async fn capacity_updates_are_checked() {
        let manager = HostelManager::new(&context());
        let admin = user(1, Role::Admin);

        let hostel = manager
            .create_hostel(&admin, new_hostel("Aravali", HostelGender::Male))
            .await
            .unwrap();
        let room = manager
            .create_room(&admin, draft(&hostel, "101", RoomType::Double))
            .await
            .unwrap();

        let zero = manager
            .update_room(
                &admin,
                room.id,
                RoomChanges {
                    capacity: Some(0),
                    ..Default::default()
                },
            )
            .await;
        assert!(matches!(zero, Err(WorkflowError::Validation(_))));

        let grown = manager
            .update_room(
                &admin,
                room.id,
                RoomChanges {
                    capacity: Some(3),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(grown.capacity, 3);
    }
}
