use crate::app::SdkApp;
use crate::authority::AuthorityList;
use crate::cache::ManagedCache;
use crate::probe::{classify_probe_output, ProbeRunner};
use crate::OracleError;
use futures::future::join_all;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;
use tokio::runtime::Runtime;
use tokio::sync::Semaphore;
use tracing::{debug, warn};

/// How a managed-status answer was reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Basis {
    Authority,
    ProbeMismatch,
    ProbeExplicitUnmanaged,
    ProbeClean,
    ProbeUnrecognized,
    ProbeFailed,
}

impl fmt::Display for Basis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Authority => "authority",
            Self::ProbeMismatch => "probe-mismatch",
            Self::ProbeExplicitUnmanaged => "probe-explicit-unmanaged",
            Self::ProbeClean => "probe-clean",
            Self::ProbeUnrecognized => "probe-unrecognized",
            Self::ProbeFailed => "probe-failed",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Classification {
    pub managed: bool,
    pub basis: Basis,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl Classification {
    pub fn new(managed: bool, basis: Basis) -> Self {
        Self {
            managed,
            basis,
            detail: None,
        }
    }

    fn failed(detail: String) -> Self {
        Self {
            managed: false,
            basis: Basis::ProbeFailed,
            detail: Some(detail),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct OracleOptions {
    /// Upper bound on probes in flight at once.
    pub concurrency: usize,
}

impl Default for OracleOptions {
    fn default() -> Self {
        Self { concurrency: 4 }
    }
}

/// Decides whether the SDK manages a package's version for one app.
///
/// The bundled authority list, when present and non-empty, answers every
/// question without spawning anything. Otherwise each distinct package is
/// probed once through the `ProbeRunner`, with answers cached for the life of
/// the oracle. Probe errors and timeouts count as not managed and are
/// surfaced through `Basis::ProbeFailed`.
pub struct ManagedOracle {
    app: SdkApp,
    authority: Option<AuthorityList>,
    probe: Arc<dyn ProbeRunner>,
    cache: ManagedCache,
    options: OracleOptions,
    runtime: Runtime,
}

impl ManagedOracle {
    pub fn new(
        app: SdkApp,
        authority: Option<AuthorityList>,
        probe: Arc<dyn ProbeRunner>,
        options: OracleOptions,
    ) -> Result<Self, OracleError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        let authority = authority.filter(|a| !a.packages.is_empty());
        match &authority {
            Some(list) => debug!("oracle using authority list {}", list.path.display()),
            None => debug!("oracle using probe '{}'", probe.name()),
        }
        Ok(Self {
            app,
            authority,
            probe,
            cache: ManagedCache::new(),
            options,
            runtime,
        })
    }

    pub fn app(&self) -> &SdkApp {
        &self.app
    }

    pub fn authority(&self) -> Option<&AuthorityList> {
        self.authority.as_ref()
    }

    pub fn cache(&self) -> &ManagedCache {
        &self.cache
    }

    pub fn is_managed(&self, package: &str) -> bool {
        self.classify(package).managed
    }

    pub fn classify(&self, package: &str) -> Classification {
        self.classify_all([package])
            .remove(package)
            .unwrap_or_else(|| Classification::new(false, Basis::ProbeUnrecognized))
    }

    /// Classify every distinct package, probing concurrently up to the
    /// configured bound.
    pub fn classify_all<I, S>(&self, packages: I) -> BTreeMap<String, Classification>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let unique: BTreeSet<String> = packages
            .into_iter()
            .map(|p| p.as_ref().to_owned())
            .collect();

        if let Some(list) = &self.authority {
            return unique
                .into_iter()
                .map(|p| {
                    let managed = list.contains(&p);
                    (p, Classification::new(managed, Basis::Authority))
                })
                .collect();
        }

        let semaphore = Semaphore::new(self.options.concurrency.max(1));
        let results = self.runtime.block_on(join_all(
            unique.iter().map(|p| self.classify_by_probe(p, &semaphore)),
        ));
        unique.into_iter().zip(results).collect()
    }

    async fn classify_by_probe(&self, package: &str, semaphore: &Semaphore) -> Classification {
        let cell = self.cache.cell(self.app.dir(), package);
        cell.get_or_init(|| async {
            let _permit = semaphore.acquire().await.ok();
            match self.probe.probe(package, self.app.dir()).await {
                Ok(output) => {
                    let (managed, basis) = classify_probe_output(&output);
                    debug!("{package}: {basis} (managed={managed})");
                    Classification::new(managed, basis)
                }
                Err(e) => {
                    warn!("probe for {package} failed: {e}");
                    Classification::failed(e.to_string())
                }
            }
        })
        .await
        .clone()
    }
}
