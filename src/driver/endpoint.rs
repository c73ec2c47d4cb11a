//! Endpoint Resolution
//!
//! Resolves the management LIF, derives the SVM when the backend config does
//! not name one, and validates the NFS data LIF and aggregate assignment.

use crate::config::{BackendConfig, DriverContext};
use crate::domain::ports::{AddressResolver, ApiClientFactory, ClientConfig, OntapApi, OntapApiRef};
use crate::error::{Error, Result};
use std::net::IpAddr;
use tracing::{debug, error};

/// Resolve the management LIF to its addresses
pub async fn resolve_management_lif(
    config: &BackendConfig,
    resolver: &dyn AddressResolver,
) -> Result<Vec<IpAddr>> {
    let addresses = lookup(resolver, &config.management_lif).await.map_err(|e| {
        error!("Host lookup failed for ManagementLIF {}: {}", config.management_lif, e);
        e
    })?;

    debug!(
        hostname = %config.management_lif,
        addresses = ?addresses,
        "Addresses found from ManagementLIF lookup."
    );

    Ok(addresses)
}

async fn lookup(resolver: &dyn AddressResolver, host: &str) -> Result<Vec<IpAddr>> {
    match resolver.lookup_host(host).await {
        Ok(addresses) if !addresses.is_empty() => Ok(addresses),
        Ok(_) => Err(Error::EndpointUnreachable {
            host: host.to_string(),
            reason: "no addresses found".into(),
        }),
        Err(e) => Err(Error::EndpointUnreachable {
            host: host.to_string(),
            reason: e.to_string(),
        }),
    }
}

fn client_config(config: &BackendConfig) -> ClientConfig {
    ClientConfig {
        management_lif: config.management_lif.clone(),
        svm: config.svm.clone(),
        username: config.username.clone(),
        password: config.password.clone(),
    }
}

/// Build an API client scoped to the backend's SVM
///
/// When the config names no SVM, the single SVM visible to the credentials is
/// adopted and written back into the config, and the client is rebuilt so that
/// it is scoped to it.
pub async fn initialize_api(
    config: &mut BackendConfig,
    factory: &dyn ApiClientFactory,
) -> Result<OntapApiRef> {
    let client = factory.connect(&client_config(config))?;

    if !config.svm.is_empty() {
        debug!(svm = %config.svm, "Using specified SVM.");
        return Ok(client);
    }

    let svms = client.svm_names().await?;
    config.svm = match svms.as_slice() {
        [svm] => svm.clone(),
        [] => return Err(Error::NoContext),
        _ => return Err(Error::AmbiguousContext { count: svms.len() }),
    };

    let client = factory.connect(&client_config(config))?;
    debug!(svm = %config.svm, "Using derived SVM.");

    Ok(client)
}

/// Confirm the configured aggregate is assigned to the SVM
pub async fn validate_aggregate(api: &dyn OntapApi, config: &BackendConfig) -> Result<()> {
    if config.aggregate.is_empty() {
        return Err(Error::Config(
            "no aggregate was specified in the config file".into(),
        ));
    }

    let svm_aggregates = api.svm_aggregate_names().await?;
    if svm_aggregates.is_empty() {
        return Err(Error::NoCapacity {
            svm: config.svm.clone(),
        });
    }

    if svm_aggregates.iter().any(|a| a == &config.aggregate) {
        debug!(svm = %config.svm, aggregate = %config.aggregate, "Found aggregate for SVM.");
        return Ok(());
    }

    Err(Error::AggregateNotAssigned {
        aggregate: config.aggregate.clone(),
        svm: config.svm.clone(),
    })
}

/// Validation shared by the NAS drivers
///
/// Adopts the first NFS data LIF when none is configured; otherwise checks the
/// configured one against the SVM's NFS LIFs.
pub async fn validate_nas_driver(
    api: &dyn OntapApi,
    config: &mut BackendConfig,
    resolver: &dyn AddressResolver,
) -> Result<()> {
    let data_lifs = api.data_lifs("nfs").await?;

    let Some(first) = data_lifs.first() else {
        return Err(Error::NoDataLifs {
            svm: config.svm.clone(),
        });
    };
    debug!(data_lifs = ?data_lifs, "Found NAS LIFs.");

    if config.data_lif.is_empty() {
        config.data_lif = first.clone();
    } else {
        validate_data_lifs(config, &data_lifs, resolver).await?;
    }

    if config.driver_context == DriverContext::Docker {
        validate_aggregate(api, config).await?;
    }

    Ok(())
}

/// Check that every address of the configured data LIF is one of `data_lifs`
pub async fn validate_data_lifs(
    config: &BackendConfig,
    data_lifs: &[String],
    resolver: &dyn AddressResolver,
) -> Result<()> {
    let addresses = lookup(resolver, &config.data_lif).await?;

    debug!(
        hostname = %config.data_lif,
        addresses = ?addresses,
        "Addresses found from hostname lookup."
    );

    for address in addresses {
        let found = data_lifs.iter().any(|lif| match lif.parse::<IpAddr>() {
            Ok(ip) => ip == address,
            Err(_) => lif == &address.to_string(),
        });

        if !found {
            debug!(host_name_address = %address, "Could not find matching Data LIF.");
            return Err(Error::DataLifMismatch {
                address: address.to_string(),
            });
        }
        debug!(host_name_address = %address, "Found matching Data LIF.");
    }

    Ok(())
}
