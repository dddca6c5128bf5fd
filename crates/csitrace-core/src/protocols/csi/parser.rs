use super::layout;

/// Service and method named by a gRPC `:path`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RpcPath<'a> {
    pub service: &'a str,
    pub method: &'a str,
}

/// Split `/csi.v1.<Service>/<Method>` at the last separator.
///
/// Returns `None` for paths outside the CSI v1 package or with an empty
/// service or method.
pub fn parse_rpc_path(path: &str) -> Option<RpcPath<'_>> {
    let rest = path.strip_prefix(layout::PATH_PREFIX)?;
    let (service, method) = rest.rsplit_once(layout::PATH_SEPARATOR)?;
    if service.is_empty() || method.is_empty() {
        return None;
    }
    Some(RpcPath { service, method })
}

#[cfg(test)]
mod tests {
    use super::{RpcPath, parse_rpc_path};

    #[test]
    fn parse_controller_path() {
        assert_eq!(
            parse_rpc_path("/csi.v1.Controller/CreateVolume"),
            Some(RpcPath {
                service: "Controller",
                method: "CreateVolume"
            })
        );
    }

    #[test]
    fn reject_foreign_package() {
        assert_eq!(parse_rpc_path("/grpc.health.v1.Health/Check"), None);
        assert_eq!(parse_rpc_path("/csi.v2.Node/NodeGetInfo"), None);
    }

    #[test]
    fn reject_missing_parts() {
        assert_eq!(parse_rpc_path("/csi.v1.Node"), None);
        assert_eq!(parse_rpc_path("/csi.v1.Node/"), None);
        assert_eq!(parse_rpc_path("/csi.v1./Probe"), None);
    }
}
