use sea_orm_migration::{prelude::*, schema::*};

use super::m20240312_000004_create_trips::Trip;
use super::m20240312_000005_create_bookings::Booking;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(SeatAssignment::Table)
                    .if_not_exists()
                    .col(uuid(SeatAssignment::Id).primary_key())
                    .col(uuid(SeatAssignment::BookingId).not_null())
                    .col(uuid(SeatAssignment::TripId).not_null())
                    .col(integer(SeatAssignment::SeatNumber).not_null())
                    .col(
                        timestamp_with_time_zone(SeatAssignment::CreatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_seat_assignment_booking")
                            .from(SeatAssignment::Table, SeatAssignment::BookingId)
                            .to(Booking::Table, Booking::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_seat_assignment_trip")
                            .from(SeatAssignment::Table, SeatAssignment::TripId)
                            .to(Trip::Table, Trip::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Second line of defence behind the application-level conflict
        // check: a seat can only be assigned once per trip. Rows are
        // deleted when a booking leaves the pending/completed states,
        // so terminal bookings never hold the constraint.
        manager
            .create_index(
                Index::create()
                    .name("idx_seat_assignment_trip_seat")
                    .table(SeatAssignment::Table)
                    .col(SeatAssignment::TripId)
                    .col(SeatAssignment::SeatNumber)
                    .unique()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(SeatAssignment::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum SeatAssignment {
    Table,
    Id,
    BookingId,
    TripId,
    SeatNumber,
    CreatedAt,
}
