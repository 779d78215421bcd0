pub mod destination;
pub mod package;
pub mod package_destination;
pub mod reservation;
pub mod session;
pub mod traveler;
pub mod user;

pub use destination::Entity as Destination;
pub use package::Entity as Package;
pub use package_destination::Entity as PackageDestination;
pub use reservation::Entity as Reservation;
pub use session::Entity as Session;
pub use traveler::Entity as Traveler;
pub use user::Entity as User;

