pub mod budget;
pub mod consumption;
pub mod device;
pub mod resident;
pub mod supplier;
pub mod types;

pub use budget::*;
pub use consumption::*;
pub use device::*;
pub use resident::*;
pub use supplier::*;
pub use types::*;
