/// Every CSI v1 RPC path starts with this package prefix.
pub const PATH_PREFIX: &str = "/csi.v1.";
pub const PATH_SEPARATOR: char = '/';

pub const SERVICE_IDENTITY: &str = "Identity";
pub const SERVICE_CONTROLLER: &str = "Controller";
pub const SERVICE_NODE: &str = "Node";
