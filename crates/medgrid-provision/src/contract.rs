//! TDR contract provisioning.
//!
//! A contract's identity on the platform is the composite natural key
//! `system|code` of its data type. A creation conflict is reconciled by
//! listing the endpoint's contracts and locating that key; `organization`
//! must match the request for the existing contract to be adopted.

use tracing::{debug, info};

use medgrid_client::tdr::{Contract, Contracts, ContractsQuery, DataType, DeletePolicy};
use medgrid_core::{
    ErrorClass, FieldMismatch, ResolvedResource, ResourceSpec, RetryPolicy, reconcile, retry,
};

use crate::ProvisionError;

const ALLOWED_CODES: [&str; 3] = ["DAY", "MONTH", "YEAR"];

/// Creates the contract described by `spec`, adopting the pre-existing
/// contract under the same `system|code` key when creation conflicts.
pub async fn create<C: Contracts>(
    client: &C,
    policy: &RetryPolicy,
    spec: &ResourceSpec,
) -> Result<ResolvedResource, ProvisionError> {
    let contract = contract_from_spec(spec)?;
    let key = contract.data_type.key();

    match retry::execute(client, policy, || client.create_contract(&contract)).await {
        Ok(_created) => Ok(resolve(&contract, &key)),
        Err(err) if err.class() == ErrorClass::Conflict => {
            debug!(%key, "contract create conflict, reconciling");
            let outcome = reconcile(
                client.get_contracts(&ContractsQuery::default()),
                |existing: &Contract| existing.id == key,
                |existing| {
                    (existing.organization != contract.organization).then(|| {
                        FieldMismatch::new(
                            "organization",
                            contract.organization.as_str(),
                            existing.organization.as_str(),
                        )
                    })
                },
                |existing| existing.id.clone(),
            )
            .await?;
            let id = outcome.into_result(err)?;
            info!(%id, "adopted existing contract");
            Ok(resolve(&contract, &id))
        }
        Err(err) => Err(err.into()),
    }
}

/// Reads the contract back by its natural key fields.
pub async fn read<C: Contracts>(
    client: &C,
    spec: &ResourceSpec,
) -> Result<Option<ResolvedResource>, ProvisionError> {
    let organization = spec.get_str("organization")?;
    let key = format!(
        "{}|{}",
        spec.get_str("data_type.system")?,
        spec.get_str("data_type.code")?
    );
    let query = ContractsQuery {
        organization: Some(organization.to_string()),
        data_type: Some(key.clone()),
        count: spec.opt_int("count")?.map(|n| n as u32),
    };
    let contracts = client.get_contracts(&query).await?;
    Ok(contracts
        .into_iter()
        .next()
        .map(|contract| resolve(&contract, &key)))
}

fn contract_from_spec(spec: &ResourceSpec) -> Result<Contract, ProvisionError> {
    let code = spec.get_str("data_type.code")?;
    if !ALLOWED_CODES.contains(&code) {
        return Err(ProvisionError::Validation {
            field: "data_type.code",
            reason: format!("'{code}' is not one of {ALLOWED_CODES:?}"),
        });
    }
    Ok(Contract {
        id: String::new(),
        organization: spec.get_str("organization")?.to_string(),
        data_type: DataType {
            system: spec.get_str("data_type.system")?.to_string(),
            code: code.to_string(),
        },
        send_notifications: spec.opt_bool("send_notifications")?.unwrap_or(false),
        delete_policy: DeletePolicy {
            duration: spec.get_int("delete_policy.duration")?,
            unit: spec.get_str("delete_policy.unit")?.to_string(),
        },
        schema: spec.opt_json("json_schema")?.cloned(),
    })
}

fn resolve(contract: &Contract, id: &str) -> ResolvedResource {
    ResolvedResource::new(id)
        .with("organization", contract.organization.as_str())
        .with("data_type.system", contract.data_type.system.as_str())
        .with("data_type.code", contract.data_type.code.as_str())
        .with("send_notifications", contract.send_notifications)
        .with("delete_policy.duration", contract.delete_policy.duration)
        .with("delete_policy.unit", contract.delete_policy.unit.as_str())
}
