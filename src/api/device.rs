//! Device-availability collaborator consumed before southbound dispatch.

use crate::model::ids::DeviceId;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeviceKind {
    Switch,
    Router,
    Other,
}

/// Minimal view of a managed device.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    pub id: DeviceId,
    pub kind: DeviceKind,
}

/// This controller instance's mastership over a device.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MastershipRole {
    Master,
    Standby,
    None,
}

/// Inventory and reachability oracle the manager consults before
/// programming a device. Discovery and mastership election live elsewhere;
/// only this read surface is consumed here.
#[async_trait]
pub trait DeviceService: Send + Sync {
    async fn get_device(&self, id: &DeviceId) -> Option<Device>;

    async fn is_available(&self, id: &DeviceId) -> bool;

    async fn get_role(&self, id: &DeviceId) -> MastershipRole;
}
