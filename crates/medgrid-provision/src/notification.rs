//! DICOM notification provisioning.
//!
//! The notification configuration is a per-organization singleton and the
//! platform exposes no removal endpoint for it. Delete is therefore a soft
//! delete: fetch the current configuration, flip `enabled` off and resubmit
//! it, then clear local state. The disable call's outcome is ignored - local
//! state abandonment takes priority over remote confirmation, so delete
//! never blocks or fails the overall operation on a remote error.

use tracing::warn;

use medgrid_client::dicom::{Notification, NotificationConfig};
use medgrid_core::{ResolvedResource, ResourceSpec, RetryPolicy, retry};

use crate::ProvisionError;

/// Creates the notification configuration described by `spec` under the
/// bounded retry loop.
pub async fn create<C: NotificationConfig>(
    client: &C,
    policy: &RetryPolicy,
    spec: &ResourceSpec,
) -> Result<ResolvedResource, ProvisionError> {
    let organization_id = spec.get_str("organization_id")?;
    let notification = Notification {
        id: String::new(),
        enabled: spec.opt_bool("enabled")?.unwrap_or(true),
        endpoint: spec.get_str("endpoint_url")?.to_string(),
        default_organization_id: spec
            .opt_str("default_organization_id")?
            .unwrap_or_default()
            .to_string(),
    };

    let created = retry::execute(client, policy, || {
        client.create_notification(&notification, organization_id)
    })
    .await?;
    Ok(resolve(&created))
}

/// Reads the organization's notification configuration. Any terminal failure
/// reports the configuration as absent so the caller drops it from local
/// state.
pub async fn read<C: NotificationConfig>(
    client: &C,
    policy: &RetryPolicy,
    organization_id: &str,
) -> Result<Option<ResolvedResource>, ProvisionError> {
    match retry::execute(client, policy, || client.get_notification(organization_id)).await {
        Ok(notification) => Ok(Some(resolve(&notification))),
        Err(err) => {
            warn!(error = %err, organization_id, "notification read failed, reporting it absent");
            Ok(None)
        }
    }
}

/// Soft-deletes the notification configuration tracked under `id`.
///
/// The current configuration is fetched under the retry loop; an identity
/// mismatch against `id` is a hard error. Otherwise the configuration is
/// resubmitted disabled and the call's outcome is ignored: the caller clears
/// the local identity regardless.
pub async fn delete<C: NotificationConfig>(
    client: &C,
    policy: &RetryPolicy,
    organization_id: &str,
    id: &str,
) -> Result<(), ProvisionError> {
    let current =
        match retry::execute(client, policy, || client.get_notification(organization_id)).await {
            Ok(notification) => notification,
            Err(err) => {
                warn!(
                    error = %err,
                    organization_id,
                    "notification fetch before disable failed, abandoning local state"
                );
                return Ok(());
            }
        };

    if current.id != id {
        return Err(ProvisionError::IdentityMismatch {
            expected: id.to_string(),
            actual: current.id,
        });
    }

    let disabled = Notification {
        enabled: false,
        ..current
    };
    if let Err(err) = client.create_notification(&disabled, organization_id).await {
        warn!(error = %err, organization_id, "disable call failed, abandoning local state");
    }
    Ok(())
}

fn resolve(notification: &Notification) -> ResolvedResource {
    ResolvedResource::new(&notification.id)
        .with("enabled", notification.enabled)
        .with("endpoint_url", notification.endpoint.as_str())
        .with(
            "default_organization_id",
            notification.default_organization_id.as_str(),
        )
}
