use std::sync::Arc;

use crate::assembler::assemble_metas;
use crate::config::{validate, Config, ConfigError};
use crate::contract::{
    ActivateResponse, CoreRequest, CoreResponse, MetasResponse, ResultSetResponse,
};
use crate::icon_store::{HttpIconFetcher, IconError, IconStore};
use crate::model::{normalize_terms, parse_result_id, ResultMeta};
use crate::opener::{OpenError, SystemOpener, UrlOpener};
use crate::query::HttpPackageSource;
use crate::settings::{ConfigSettings, Settings, SettingsProvider};
use crate::term_cache::TermCache;

/// Failures while wiring the service, before any request is handled.
#[derive(Debug, thiserror::Error)]
pub enum SetupError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("icon store error: {0}")]
    Icon(#[from] IconError),
}

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("invalid result id: {0}")]
    InvalidResultId(String),
    #[error("open error: {0}")]
    Open(#[from] OpenError),
}

/// The four operations answered for the search dispatcher.
pub struct CoreService {
    config: Config,
    settings: Arc<dyn SettingsProvider>,
    terms: TermCache,
    icons: IconStore,
    opener: Arc<dyn UrlOpener>,
}

impl CoreService {
    /// Wires the HTTP collaborators described by `config`.
    pub fn new(config: Config) -> Result<Self, SetupError> {
        validate(&config)?;
        let timeout = std::time::Duration::from_secs(config.http_timeout_secs);
        let terms = TermCache::new(
            config.search_dir(),
            config.expiry_secs,
            Arc::new(HttpPackageSource::from_config(&config)),
        );
        let icons = IconStore::open(&config, Arc::new(HttpIconFetcher::new(timeout)))?;
        let settings = Arc::new(ConfigSettings::new(&config));
        Self::with_parts(config, settings, terms, icons, Arc::new(SystemOpener))
    }

    pub fn with_parts(
        config: Config,
        settings: Arc<dyn SettingsProvider>,
        terms: TermCache,
        icons: IconStore,
        opener: Arc<dyn UrlOpener>,
    ) -> Result<Self, SetupError> {
        validate(&config)?;
        Ok(Self {
            config,
            settings,
            terms,
            icons,
            opener,
        })
    }

    pub fn with_settings(mut self, settings: Arc<dyn SettingsProvider>) -> Self {
        self.settings = settings;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn initial_search(&self, terms: &[String]) -> Vec<String> {
        let Some(settings) = self.active_settings() else {
            return Vec::new();
        };
        let Some(term) = normalize_terms(terms, &settings.keyword) else {
            return Vec::new();
        };

        match self.terms.lookup(&term) {
            Ok(rows) => rows.iter().map(|row| row.result_id()).collect(),
            Err(error) => {
                log::error!("search for '{term}' failed: {error}");
                Vec::new()
            }
        }
    }

    /// Previous results are not used to narrow the search; the new terms are
    /// looked up from scratch.
    pub fn subsearch(&self, _previous: &[String], terms: &[String]) -> Vec<String> {
        self.initial_search(terms)
    }

    pub fn resolve_metas(&self, ids: &[String]) -> Vec<ResultMeta> {
        if self.active_settings().is_none() {
            return Vec::new();
        }
        assemble_metas(ids, &self.icons)
    }

    /// Opens the package page for `id`. Returns `false` when the provider is
    /// disabled and nothing was opened.
    pub fn activate(&self, id: &str) -> Result<bool, ServiceError> {
        if id.trim().is_empty() {
            return Err(ServiceError::InvalidRequest(
                "activate requires a result id".to_string(),
            ));
        }
        if self.active_settings().is_none() {
            return Ok(false);
        }

        let parsed =
            parse_result_id(id).ok_or_else(|| ServiceError::InvalidResultId(id.to_string()))?;
        let url = self.package_url(parsed.name);
        log::info!("opening {url}");
        self.opener.open(&url)?;
        Ok(true)
    }

    pub fn package_url(&self, name: &str) -> String {
        format!(
            "{}/{}",
            self.config.package_url_prefix.trim_end_matches('/'),
            name
        )
    }

    pub fn handle_command(&self, request: CoreRequest) -> Result<CoreResponse, ServiceError> {
        match request {
            CoreRequest::InitialSearch(request) => Ok(CoreResponse::ResultSet(ResultSetResponse {
                ids: self.initial_search(&request.terms),
            })),
            CoreRequest::SubSearch(request) => Ok(CoreResponse::ResultSet(ResultSetResponse {
                ids: self.subsearch(&request.previous, &request.terms),
            })),
            CoreRequest::ResolveMetas(request) => Ok(CoreResponse::Metas(MetasResponse {
                metas: self
                    .resolve_metas(&request.ids)
                    .into_iter()
                    .map(Into::into)
                    .collect(),
            })),
            CoreRequest::Activate(request) => {
                let activated = self.activate(&request.id)?;
                Ok(CoreResponse::Activate(ActivateResponse { activated }))
            }
        }
    }

    fn active_settings(&self) -> Option<Settings> {
        match self.settings.snapshot() {
            Ok(settings) if settings.enabled => Some(settings),
            Ok(_) => {
                log::debug!("provider disabled in settings; ignoring request");
                None
            }
            Err(error) => {
                log::warn!("{error}; ignoring request");
                None
            }
        }
    }
}
