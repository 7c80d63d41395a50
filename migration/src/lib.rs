pub use sea_orm_migration::prelude::*;

mod m20240312_000001_create_users;
mod m20240312_000002_create_buses;
mod m20240312_000003_create_routes;
mod m20240312_000004_create_trips;
mod m20240312_000005_create_bookings;
mod m20240312_000006_create_seat_assignments;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240312_000001_create_users::Migration),
            Box::new(m20240312_000002_create_buses::Migration),
            Box::new(m20240312_000003_create_routes::Migration),
            Box::new(m20240312_000004_create_trips::Migration),
            Box::new(m20240312_000005_create_bookings::Migration),
            Box::new(m20240312_000006_create_seat_assignments::Migration),
        ]
    }
}
