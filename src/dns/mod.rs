//! Family-restricted DNS resolution for measurement clients
//!
//! reqwest picks whichever address the system resolver returns first, which
//! on a dual-stack host is usually IPv6. [`FamilyResolver`] plugs into
//! reqwest's resolver hook and only ever hands out addresses of one family.

use crate::{
    error::{AppError, Result},
    types::NetworkFamily,
};
use reqwest::dns::{Addrs, Name, Resolve, Resolving};
use std::net::{IpAddr, SocketAddr};
use trust_dns_resolver::{
    config::{LookupIpStrategy, ResolverConfig, ResolverOpts},
    system_conf,
    TokioAsyncResolver,
};

/// Resolver that only yields addresses of a single family
#[derive(Clone)]
pub struct FamilyResolver {
    family: NetworkFamily,
    resolver: TokioAsyncResolver,
}

impl FamilyResolver {
    /// Create a resolver from the system configuration, falling back to the
    /// built-in public resolvers when none can be read
    pub fn new(family: NetworkFamily) -> Self {
        let (config, opts) = system_conf::read_system_conf()
            .unwrap_or_else(|_| (ResolverConfig::default(), ResolverOpts::default()));
        Self::with_config(family, config, opts)
    }

    /// Create a resolver from an explicit configuration
    pub fn with_config(family: NetworkFamily, config: ResolverConfig, mut opts: ResolverOpts) -> Self {
        opts.ip_strategy = strategy_for(family);
        Self {
            family,
            resolver: TokioAsyncResolver::tokio(config, opts),
        }
    }

    pub fn family(&self) -> NetworkFamily {
        self.family
    }

    /// Resolve `host` to addresses of this resolver's family
    pub async fn lookup(&self, host: &str) -> Result<Vec<IpAddr>> {
        let addrs = match host.trim_matches(|c| c == '[' || c == ']').parse::<IpAddr>() {
            Ok(ip) => vec![ip],
            Err(_) => self.resolver.lookup_ip(host).await?.iter().collect(),
        };

        let filtered: Vec<IpAddr> = addrs.into_iter().filter(|ip| self.family.matches(ip)).collect();
        if filtered.is_empty() {
            return Err(AppError::dns_resolution(format!(
                "{} has no {} address",
                host,
                self.family.name()
            )));
        }
        Ok(filtered)
    }
}

impl Resolve for FamilyResolver {
    fn resolve(&self, name: Name) -> Resolving {
        let resolver = self.clone();
        Box::pin(async move {
            let ips = resolver.lookup(name.as_str()).await?;
            let addrs: Addrs = Box::new(ips.into_iter().map(|ip| SocketAddr::new(ip, 0)));
            Ok::<Addrs, Box<dyn std::error::Error + Send + Sync>>(addrs)
        })
    }
}

fn strategy_for(family: NetworkFamily) -> LookupIpStrategy {
    match family {
        NetworkFamily::V4 => LookupIpStrategy::Ipv4Only,
        NetworkFamily::V6 => LookupIpStrategy::Ipv6Only,
    }
}
