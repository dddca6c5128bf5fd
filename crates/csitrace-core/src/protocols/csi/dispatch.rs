use std::fmt;

use prost::Message;
use serde::Serialize;

use super::error::CsiError;
use super::layout;
use super::messages::*;
use super::parser::RpcPath;

/// Which half of a unary call a payload belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageSide {
    Request,
    Response,
}

impl fmt::Display for MessageSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageSide::Request => f.write_str("request"),
            MessageSide::Response => f.write_str("response"),
        }
    }
}

macro_rules! csi_catalog {
    ($( $service:expr => { $( $method:ident($request:ident, $response:ident) ),* $(,)? } )*) => {
        /// One RPC of the CSI v1 Identity, Controller or Node service.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum CsiMethod {
            $( $( $method, )* )*
        }

        impl CsiMethod {
            pub const ALL: &'static [CsiMethod] = &[ $( $( CsiMethod::$method, )* )* ];

            pub fn service(self) -> &'static str {
                match self {
                    $( $( CsiMethod::$method => $service, )* )*
                }
            }

            pub fn name(self) -> &'static str {
                match self {
                    $( $( CsiMethod::$method => stringify!($method), )* )*
                }
            }

            fn decode(self, side: MessageSide, bytes: &[u8]) -> Result<CsiMessage, prost::DecodeError> {
                match (self, side) {
                    $( $(
                        (CsiMethod::$method, MessageSide::Request) => {
                            $request::decode(bytes).map(CsiMessage::$request)
                        }
                        (CsiMethod::$method, MessageSide::Response) => {
                            $response::decode(bytes).map(CsiMessage::$response)
                        }
                    )* )*
                }
            }
        }

        /// A decoded CSI message; serializes as the bare message.
        #[derive(Debug, Clone, PartialEq, Serialize)]
        #[serde(untagged)]
        pub enum CsiMessage {
            $( $(
                $request($request),
                $response($response),
            )* )*
        }
    };
}

csi_catalog! {
    layout::SERVICE_IDENTITY => {
        GetPluginInfo(GetPluginInfoRequest, GetPluginInfoResponse),
        GetPluginCapabilities(GetPluginCapabilitiesRequest, GetPluginCapabilitiesResponse),
        Probe(ProbeRequest, ProbeResponse),
    }
    layout::SERVICE_CONTROLLER => {
        CreateVolume(CreateVolumeRequest, CreateVolumeResponse),
        DeleteVolume(DeleteVolumeRequest, DeleteVolumeResponse),
        ControllerPublishVolume(ControllerPublishVolumeRequest, ControllerPublishVolumeResponse),
        ControllerUnpublishVolume(ControllerUnpublishVolumeRequest, ControllerUnpublishVolumeResponse),
        ValidateVolumeCapabilities(ValidateVolumeCapabilitiesRequest, ValidateVolumeCapabilitiesResponse),
        ListVolumes(ListVolumesRequest, ListVolumesResponse),
        GetCapacity(GetCapacityRequest, GetCapacityResponse),
        ControllerGetCapabilities(ControllerGetCapabilitiesRequest, ControllerGetCapabilitiesResponse),
        CreateSnapshot(CreateSnapshotRequest, CreateSnapshotResponse),
        DeleteSnapshot(DeleteSnapshotRequest, DeleteSnapshotResponse),
        ListSnapshots(ListSnapshotsRequest, ListSnapshotsResponse),
        ControllerExpandVolume(ControllerExpandVolumeRequest, ControllerExpandVolumeResponse),
        ControllerGetVolume(ControllerGetVolumeRequest, ControllerGetVolumeResponse),
    }
    layout::SERVICE_NODE => {
        NodeStageVolume(NodeStageVolumeRequest, NodeStageVolumeResponse),
        NodeUnstageVolume(NodeUnstageVolumeRequest, NodeUnstageVolumeResponse),
        NodePublishVolume(NodePublishVolumeRequest, NodePublishVolumeResponse),
        NodeUnpublishVolume(NodeUnpublishVolumeRequest, NodeUnpublishVolumeResponse),
        NodeGetVolumeStats(NodeGetVolumeStatsRequest, NodeGetVolumeStatsResponse),
        NodeExpandVolume(NodeExpandVolumeRequest, NodeExpandVolumeResponse),
        NodeGetCapabilities(NodeGetCapabilitiesRequest, NodeGetCapabilitiesResponse),
        NodeGetInfo(NodeGetInfoRequest, NodeGetInfoResponse),
    }
}

impl CsiMethod {
    /// Resolve a service/method pair; `None` for RPCs outside the catalog.
    pub fn lookup(service: &str, method: &str) -> Option<CsiMethod> {
        Self::ALL
            .iter()
            .copied()
            .find(|candidate| candidate.service() == service && candidate.name() == method)
    }

    pub fn from_path(path: &RpcPath<'_>) -> Option<CsiMethod> {
        Self::lookup(path.service, path.method)
    }

    /// # Errors
    /// Returns `CsiError::Decode` when `bytes` is not a valid request message.
    pub fn decode_request(self, bytes: &[u8]) -> Result<CsiMessage, CsiError> {
        self.decode_side(MessageSide::Request, bytes)
    }

    /// # Errors
    /// Returns `CsiError::Decode` when `bytes` is not a valid response message.
    pub fn decode_response(self, bytes: &[u8]) -> Result<CsiMessage, CsiError> {
        self.decode_side(MessageSide::Response, bytes)
    }

    fn decode_side(self, side: MessageSide, bytes: &[u8]) -> Result<CsiMessage, CsiError> {
        self.decode(side, bytes).map_err(|source| CsiError::Decode {
            method: self,
            side,
            source,
        })
    }
}

impl fmt::Display for CsiMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}/{}", layout::PATH_PREFIX, self.service(), self.name())
    }
}
