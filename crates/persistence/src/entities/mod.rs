//! Database entity definitions (row mappings).

pub mod alert;
pub mod command;
pub mod device;
pub mod geofence;
pub mod location;

pub use alert::AlertEntity;
pub use command::RemoteCommandEntity;
pub use device::DeviceEntity;
pub use geofence::GeofenceEntity;
pub use location::LocationSampleEntity;
