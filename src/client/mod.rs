pub mod control_plane;

pub use control_plane::{error_message, ClientError, ClusterApi, ControlPlaneClient};
