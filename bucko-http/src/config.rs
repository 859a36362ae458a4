//! Building the shared `reqwest::Client` from configuration

use crate::endpoint::header_map;
use crate::errors::HttpError;
use bucko_config::Validatable;
use reqwest::{Client, NoProxy, Proxy};
use tracing::debug;

pub use bucko_config::{ConnectionPoolConfig, HttpConfig, ProxyConfig};

/// Build a client with the given timeouts, trust, redirect, pool, proxy and
/// default header settings
pub fn build_client(config: &HttpConfig) -> Result<Client, HttpError> {
    config.validate()?;

    debug!(
        "Building HTTP client with {}s timeout, {} max redirects",
        config.timeout.as_secs(),
        config.max_redirects
    );

    let mut builder = Client::builder()
        .timeout(config.timeout)
        .connect_timeout(config.connection_pool.connection_timeout)
        .pool_idle_timeout(config.connection_pool.idle_timeout)
        .pool_max_idle_per_host(config.connection_pool.max_idle_per_host)
        .user_agent(&config.user_agent)
        .default_headers(header_map(&config.default_headers)?)
        .danger_accept_invalid_certs(!config.verify_ssl)
        .redirect(reqwest::redirect::Policy::limited(
            config.max_redirects as usize,
        ));

    if let Some(proxy) = &config.proxy {
        builder = apply_proxy(builder, proxy)?;
    }

    Ok(builder.build()?)
}

fn apply_proxy(
    mut builder: reqwest::ClientBuilder,
    proxy: &ProxyConfig,
) -> Result<reqwest::ClientBuilder, HttpError> {
    let no_proxy = || proxy.no_proxy.as_deref().and_then(NoProxy::from_string);

    if let Some(url) = &proxy.http_proxy {
        debug!("Routing http traffic through {}", url);
        builder = builder.proxy(Proxy::http(url)?.no_proxy(no_proxy()));
    }

    if let Some(url) = &proxy.https_proxy {
        debug!("Routing https traffic through {}", url);
        builder = builder.proxy(Proxy::https(url)?.no_proxy(no_proxy()));
    }

    Ok(builder)
}
