use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "payment_status")]
pub enum PaymentStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "completed")]
    Completed,
    #[sea_orm(string_value = "failed")]
    Failed,
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
}

impl PaymentStatus {
    /// Completed, failed and cancelled are terminal; pending is the
    /// only state with outgoing transitions.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, PaymentStatus::Pending)
    }

    /// Statuses whose bookings currently hold seats on a trip.
    pub fn holding() -> [PaymentStatus; 2] {
        [PaymentStatus::Pending, PaymentStatus::Completed]
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "booking")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: Uuid,
    pub trip_id: Uuid,
    #[sea_orm(unique)]
    pub booking_reference: String,
    pub payment_status: PaymentStatus,
    pub total_amount: i64,
    /// Transaction-start time of the creating transaction, so expiry
    /// math lines up with what the reserving transaction observed.
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id"
    )]
    User,
    #[sea_orm(
        belongs_to = "super::trip::Entity",
        from = "Column::TripId",
        to = "super::trip::Column::Id"
    )]
    Trip,
    #[sea_orm(has_many = "super::seat_assignment::Entity")]
    SeatAssignments,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Related<super::trip::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Trip.def()
    }
}

impl Related<super::seat_assignment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SeatAssignments.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pending_is_not_terminal() {
        assert!(!PaymentStatus::Pending.is_terminal());
    }

    #[test]
    fn test_all_other_statuses_are_terminal() {
        assert!(PaymentStatus::Completed.is_terminal());
        assert!(PaymentStatus::Failed.is_terminal());
        assert!(PaymentStatus::Cancelled.is_terminal());
    }

    #[test]
    fn test_holding_statuses() {
        let holding = PaymentStatus::holding();
        assert!(holding.contains(&PaymentStatus::Pending));
        assert!(holding.contains(&PaymentStatus::Completed));
        assert!(!holding.contains(&PaymentStatus::Cancelled));
        assert!(!holding.contains(&PaymentStatus::Failed));
    }
}
