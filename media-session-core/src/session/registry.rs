use std::sync::Arc;

use crate::models::device::{CaptureDevice, MediaKind};
use crate::models::error::CaptureError;
use crate::traits::capture_platform::CapturePlatform;

/// Capture device enumeration.
///
/// Results are a point-in-time view; call `list()` again before every picker
/// opens since devices come and go.
#[derive(Clone)]
pub struct DeviceRegistry {
    platform: Arc<dyn CapturePlatform>,
}

impl DeviceRegistry {
    pub fn new(platform: Arc<dyn CapturePlatform>) -> Self {
        Self { platform }
    }

    /// Grant transient access to device metadata (labels) for `kinds`.
    pub async fn request_permission(&self, kinds: &[MediaKind]) -> Result<(), CaptureError> {
        self.platform.request_permission(kinds).await
    }

    /// All capture devices in platform order, with fallback labels filled in.
    pub async fn list(&self) -> Result<Vec<CaptureDevice>, CaptureError> {
        let devices = self.platform.enumerate_devices().await?;
        Ok(devices
            .into_iter()
            .map(|device| CaptureDevice {
                label: device.display_label(),
                ..device
            })
            .collect())
    }

    pub async fn list_kind(&self, kind: MediaKind) -> Result<Vec<CaptureDevice>, CaptureError> {
        Ok(self.list().await?.into_iter().filter(|d| d.kind == kind).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::acquirer::tests::ScriptedPlatform;

    fn platform() -> ScriptedPlatform {
        ScriptedPlatform {
            devices: vec![
                CaptureDevice::new("cam-a-1234", MediaKind::Video, ""),
                CaptureDevice::new("mic-a", MediaKind::Audio, "Built-in Microphone"),
                CaptureDevice::new("mic-b-5678", MediaKind::Audio, " "),
            ],
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn list_fills_withheld_labels() {
        let registry = DeviceRegistry::new(Arc::new(platform()));

        let labels: Vec<String> =
            registry.list().await.unwrap().into_iter().map(|d| d.label).collect();

        assert_eq!(
            labels,
            vec!["Camera cam-a...", "Built-in Microphone", "Microphone mic-b..."]
        );
    }

    #[tokio::test]
    async fn list_kind_keeps_platform_order() {
        let registry = DeviceRegistry::new(Arc::new(platform()));

        let ids: Vec<String> = registry
            .list_kind(MediaKind::Audio)
            .await
            .unwrap()
            .into_iter()
            .map(|d| d.id)
            .collect();

        assert_eq!(ids, vec!["mic-a", "mic-b-5678"]);
    }

    #[tokio::test]
    async fn permission_refusal_is_reported() {
        let registry = DeviceRegistry::new(Arc::new(ScriptedPlatform {
            permission: Some(CaptureError::PermissionDenied),
            ..platform()
        }));

        assert_eq!(
            registry.request_permission(&MediaKind::ALL).await,
            Err(CaptureError::PermissionDenied)
        );
    }
}
