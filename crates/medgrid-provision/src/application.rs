//! IAM application provisioning.
//!
//! `name` + `proposition_id` is the natural key. A creation conflict is
//! reconciled against the existing applications under the same key:
//! `description` and `proposition_id` must match the request for the
//! existing application to be adopted.

use tracing::{debug, info};
use uuid::Uuid;

use medgrid_client::iam::{Application, Applications, ApplicationsQuery};
use medgrid_core::{
    ErrorClass, FieldMismatch, ResolvedResource, ResourceSpec, RetryPolicy, reconcile, retry,
};

use crate::ProvisionError;

/// Creates the application described by `spec`, adopting an equivalent
/// pre-existing one when creation conflicts.
pub async fn create<C: Applications>(
    client: &C,
    policy: &RetryPolicy,
    spec: &ResourceSpec,
) -> Result<ResolvedResource, ProvisionError> {
    let app = application_from_spec(spec)?;

    match retry::execute(client, policy, || client.create_application(&app)).await {
        Ok(created) => Ok(resolve(&created)),
        Err(err) if err.class() == ErrorClass::Conflict => {
            debug!(name = %app.name, "application create conflict, reconciling");
            let query = ApplicationsQuery {
                name: Some(app.name.clone()),
                proposition_id: Some(app.proposition_id.clone()),
            };
            let outcome = reconcile(
                client.get_applications(&query),
                |existing: &Application| existing.name == app.name,
                |existing| {
                    if existing.description != app.description {
                        return Some(FieldMismatch::new(
                            "description",
                            app.description.as_str(),
                            existing.description.as_str(),
                        ));
                    }
                    if existing.proposition_id != app.proposition_id {
                        return Some(FieldMismatch::new(
                            "proposition_id",
                            app.proposition_id.as_str(),
                            existing.proposition_id.as_str(),
                        ));
                    }
                    None
                },
                Application::clone,
            )
            .await?;
            let adopted = outcome.into_result(err)?;
            info!(id = %adopted.id, name = %adopted.name, "adopted existing application");
            Ok(resolve(&adopted))
        }
        Err(err) => Err(err.into()),
    }
}

/// Reads an application by its durable identity. `None` means the platform
/// no longer knows the id and the caller should drop it from local state.
pub async fn read<C: Applications>(
    client: &C,
    id: &str,
) -> Result<Option<ResolvedResource>, ProvisionError> {
    match client.get_application_by_id(id).await {
        Ok(app) => Ok(Some(resolve(&app))),
        Err(err) if err.is_not_found() => Ok(None),
        Err(err) => Err(err.into()),
    }
}

/// Applications cannot be removed from the platform. Delete only abandons
/// the local identity and always succeeds.
pub async fn delete<C: Applications>(_client: &C, _id: &str) -> Result<(), ProvisionError> {
    Ok(())
}

fn application_from_spec(spec: &ResourceSpec) -> Result<Application, ProvisionError> {
    let name = spec.get_str("name")?;
    if name.chars().any(|c| c.is_ascii_lowercase()) {
        return Err(ProvisionError::Validation {
            field: "name",
            reason: "IAM application names must be upper case".into(),
        });
    }
    let global_reference_id = match spec.opt_str("global_reference_id")? {
        Some(value) if !value.is_empty() => value.to_string(),
        _ => Uuid::new_v4().to_string(),
    };
    Ok(Application {
        id: String::new(),
        name: name.to_string(),
        description: spec.get_str("description")?.to_string(),
        proposition_id: spec.get_str("proposition_id")?.to_string(),
        global_reference_id,
    })
}

fn resolve(app: &Application) -> ResolvedResource {
    ResolvedResource::new(&app.id)
        .with("name", app.name.as_str())
        .with("description", app.description.as_str())
        .with("proposition_id", app.proposition_id.as_str())
        .with("global_reference_id", app.global_reference_id.as_str())
}
