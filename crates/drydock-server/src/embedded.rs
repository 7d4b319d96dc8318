//! In-process embedded server driver.
//!
//! [`EmbeddedDriver`] is the hyper-backed [`ServerDriver`] the harness
//! ships with: a real TCP connector, real request routing across the
//! installed contexts, and graceful drain on shutdown. Each deployed
//! context answers with its routing metadata as JSON, which is exactly
//! what an addressability test needs to assert against.
//!
//! It emulates the release families of [`DriverVariant`] faithfully
//! enough for lifecycle and deployment testing: capability checks,
//! version preflight and bundle extraction are real, while secure
//! connectors are declined as unimplemented even on TLS-capable
//! variants.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use http::{header, Response, StatusCode};
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::service::service_fn;
use hyper::Request;
use hyper_util::rt::{TokioExecutor, TokioIo, TokioTimer};
use tokio::net::TcpListener;

use drydock_core::ServerVersion;

use crate::driver::{
    ConnectorSettings, DeployedContext, DriverVariant, GoalState, ServerDriver,
    ServletRegistration, SocketBinding, WebContext,
};
use crate::error::DriverError;
use crate::shutdown::{ConnectionTracker, StopSignal};

/// How long shutdown waits for in-flight connections to drain.
const DRAIN_GRACE: Duration = Duration::from_secs(5);

/// A security realm parsed from a properties file.
#[derive(Debug)]
struct Realm {
    name: String,
    users: HashMap<String, String>,
}

/// State that only exists while the connector is up.
#[derive(Debug)]
struct RunState {
    stop: StopSignal,
    tracker: ConnectionTracker,
    binding: SocketBinding,
}

#[derive(Debug)]
struct Shared {
    contexts: RwLock<Vec<Arc<DeployedContext>>>,
    realm: RwLock<Option<Realm>>,
    run: RwLock<Option<RunState>>,
}

/// Connector parameters the per-connection tasks need.
#[derive(Debug, Clone)]
struct ServeSettings {
    header_buffer_size: usize,
    idle_timeout: Duration,
    http2: bool,
}

/// The stock in-process [`ServerDriver`].
#[derive(Debug, Clone)]
pub struct EmbeddedDriver {
    variant: DriverVariant,
    version: ServerVersion,
    shared: Arc<Shared>,
}

impl EmbeddedDriver {
    /// Creates a stopped driver for the given release family.
    #[must_use]
    pub fn new(variant: DriverVariant) -> Self {
        let version = match variant {
            DriverVariant::Legacy => ServerVersion::new(&[7, 6, 21]),
            DriverVariant::Modern => ServerVersion::new(&[9, 4, 53]),
            DriverVariant::ModernHttp2 => ServerVersion::new(&[10, 0, 20]),
            DriverVariant::ModernModularEe => ServerVersion::new(&[12, 0, 16]),
        };
        Self {
            variant,
            version,
            shared: Arc::new(Shared {
                contexts: RwLock::new(Vec::new()),
                realm: RwLock::new(None),
                run: RwLock::new(None),
            }),
        }
    }

    /// Overrides the reported library version, for preflight testing.
    #[must_use]
    pub fn with_version(mut self, version: ServerVersion) -> Self {
        self.version = version;
        self
    }

    fn contexts(&self) -> std::sync::RwLockReadGuard<'_, Vec<Arc<DeployedContext>>> {
        relock(self.shared.contexts.read())
    }

    fn contexts_mut(&self) -> std::sync::RwLockWriteGuard<'_, Vec<Arc<DeployedContext>>> {
        relock(self.shared.contexts.write())
    }
}

/// Recovers the guard from a poisoned lock; none of the guarded sections
/// leave state half-written.
fn relock<G>(result: Result<G, std::sync::PoisonError<G>>) -> G {
    result.unwrap_or_else(std::sync::PoisonError::into_inner)
}

#[async_trait]
impl ServerDriver for EmbeddedDriver {
    fn variant(&self) -> DriverVariant {
        self.variant
    }

    fn version(&self) -> ServerVersion {
        self.version.clone()
    }

    async fn start(&self, settings: ConnectorSettings) -> Result<SocketBinding, DriverError> {
        if settings.tls.is_some() {
            if !self.variant.supports_tls() {
                return Err(DriverError::TlsUnsupported {
                    variant: self.variant,
                });
            }
            // TLS-capable variants accept the parameters in principle,
            // but the in-process connector is plaintext only.
            return Err(DriverError::NotImplemented {
                feature: "secure connectors",
            });
        }

        let address = format!("{}:{}", settings.host, settings.port);
        let listener = TcpListener::bind(&address)
            .await
            .map_err(|source| DriverError::Bind {
                address: address.clone(),
                source,
            })?;
        let local = listener
            .local_addr()
            .map_err(|source| DriverError::Bind { address, source })?;

        let binding = SocketBinding {
            host: settings.host,
            port: local.port(),
        };
        let stop = StopSignal::new();
        let tracker = ConnectionTracker::new();
        let serve = ServeSettings {
            header_buffer_size: settings.header_buffer_size,
            idle_timeout: settings.idle_timeout,
            http2: settings.http2,
        };

        tokio::spawn(accept_loop(
            listener,
            Arc::clone(&self.shared),
            stop.clone(),
            tracker.clone(),
            serve,
        ));

        *relock(self.shared.run.write()) = Some(RunState {
            stop,
            tracker,
            binding: binding.clone(),
        });

        tracing::debug!(port = binding.port, "connector accepting");
        Ok(binding)
    }

    fn install_realm(&self, name: &str, properties: &Path) -> Result<(), DriverError> {
        let raw = fs::read_to_string(properties).map_err(|source| DriverError::RealmInstall {
            name: name.to_string(),
            source,
        })?;

        let users = raw
            .lines()
            .filter_map(|line| {
                let line = line.trim();
                if line.is_empty() || line.starts_with('#') {
                    return None;
                }
                line.split_once(':')
                    .map(|(user, password)| (user.trim().to_string(), password.trim().to_string()))
            })
            .collect::<HashMap<_, _>>();

        tracing::info!(realm = name, users = users.len(), "security realm installed");
        *relock(self.shared.realm.write()) = Some(Realm {
            name: name.to_string(),
            users,
        });
        Ok(())
    }

    async fn install_context(
        &self,
        context: WebContext,
    ) -> Result<Arc<DeployedContext>, DriverError> {
        if relock(self.shared.run.read()).is_none() {
            return Err(DriverError::NotRunning);
        }

        let context_path = context.descriptor.context_path.clone();
        if !context.content_root.exists() {
            return Err(DriverError::ContextStart {
                context_path,
                source: io::Error::new(io::ErrorKind::NotFound, "content root does not exist"),
            });
        }

        if self
            .contexts()
            .iter()
            .any(|c| c.descriptor().context_path == context_path)
        {
            return Err(DriverError::DuplicateContext { context_path });
        }

        let extracted_root = if context.extract {
            Some(extract_bundle(&context).map_err(|source| DriverError::ContextStart {
                context_path: context.descriptor.context_path.clone(),
                source,
            })?)
        } else {
            None
        };

        let servlets = vec![ServletRegistration {
            name: "default".to_string(),
            path: context.descriptor.context_path.clone(),
        }];

        let deployed = Arc::new(DeployedContext::new(context, extracted_root, servlets));
        tracing::info!(
            context = %deployed.descriptor().context_path,
            display_name = %deployed.descriptor().display_name,
            "context started"
        );
        self.contexts_mut().push(Arc::clone(&deployed));
        Ok(deployed)
    }

    async fn remove_context(&self, context: &DeployedContext) -> Result<(), DriverError> {
        let mut contexts = self.contexts_mut();
        let Some(index) = contexts
            .iter()
            .position(|c| std::ptr::eq(c.as_ref(), context))
        else {
            return Err(DriverError::UnknownContext {
                context_path: context.descriptor().context_path.clone(),
            });
        };

        let removed = contexts.remove(index);
        drop(contexts);

        removed.set_goal_state(GoalState::Undeployed);
        if let Some(extracted) = removed.extracted_root() {
            if let Err(e) = fs::remove_dir_all(extracted) {
                tracing::debug!(
                    location = %extracted.display(),
                    error = %e,
                    "could not remove extraction directory"
                );
            }
        }

        tracing::info!(context = %removed.descriptor().context_path, "context undeployed");
        Ok(())
    }

    fn dump(&self) -> String {
        let mut out = format!("embedded server {} ({})\n", self.version, self.variant);

        match relock(self.shared.run.read()).as_ref() {
            Some(state) => {
                out.push_str(&format!(
                    "connector: {}:{} ({} active)\n",
                    state.binding.host,
                    state.binding.port,
                    state.tracker.active_connections()
                ));
            }
            None => out.push_str("connector: down\n"),
        }

        if let Some(realm) = relock(self.shared.realm.read()).as_ref() {
            out.push_str(&format!(
                "realm: {} ({} users)\n",
                realm.name,
                realm.users.len()
            ));
        }

        for context in self.contexts().iter() {
            out.push_str(&format!(
                "context: {} [{:?}]\n",
                context.descriptor().context_path,
                context.goal_state()
            ));
        }
        out
    }

    async fn shutdown(&self) -> Result<(), DriverError> {
        // No run state means start never completed; nothing to unwind.
        let Some(state) = relock(self.shared.run.write()).take() else {
            return Ok(());
        };

        state.stop.trigger();
        if tokio::time::timeout(DRAIN_GRACE, state.tracker.drained())
            .await
            .is_err()
        {
            tracing::warn!(
                active = state.tracker.active_connections(),
                "connections still open after drain grace, closing anyway"
            );
        }

        let mut contexts = self.contexts_mut();
        for context in contexts.iter() {
            context.set_goal_state(GoalState::Undeployed);
        }
        contexts.clear();
        drop(contexts);

        *relock(self.shared.realm.write()) = None;

        tracing::debug!("connector closed");
        Ok(())
    }
}

/// Extracts the bundle next to its content root (or under the configured
/// temp directory) so the served context has a directory form.
fn extract_bundle(context: &WebContext) -> io::Result<PathBuf> {
    let file_name = context
        .content_root
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| context.descriptor.display_name.clone());
    let stem = file_name
        .rsplit_once('.')
        .map_or(file_name.as_str(), |(stem, _)| stem);

    let base = match &context.temp_directory {
        Some(dir) => dir.clone(),
        None => context
            .content_root
            .parent()
            .map_or_else(std::env::temp_dir, Path::to_path_buf),
    };

    let target = base.join(format!("{stem}-extracted"));
    fs::create_dir_all(&target)?;
    fs::copy(&context.content_root, target.join(&file_name))?;
    Ok(target)
}

async fn accept_loop(
    listener: TcpListener,
    shared: Arc<Shared>,
    stop: StopSignal,
    tracker: ConnectionTracker,
    settings: ServeSettings,
) {
    loop {
        let (stream, peer) = tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok(pair) => pair,
                Err(e) => {
                    tracing::warn!(error = %e, "accept failed");
                    continue;
                }
            },
            () = stop.triggered() => break,
        };

        let token = tracker.acquire();
        let shared = Arc::clone(&shared);
        let stop = stop.clone();
        let settings = settings.clone();
        tokio::spawn(async move {
            let _token = token;
            serve_connection(stream, peer, shared, stop, settings).await;
        });
    }
    tracing::debug!("accept loop exited");
}

async fn serve_connection(
    stream: tokio::net::TcpStream,
    peer: SocketAddr,
    shared: Arc<Shared>,
    stop: StopSignal,
    settings: ServeSettings,
) {
    let io = TokioIo::new(stream);
    let service = service_fn(move |req: Request<Incoming>| {
        let shared = Arc::clone(&shared);
        async move { Ok::<_, std::convert::Infallible>(route(&shared, &req)) }
    });

    let served = async {
        if settings.http2 {
            let builder = hyper_util::server::conn::auto::Builder::new(TokioExecutor::new());
            builder
                .serve_connection(io, service)
                .await
                .map_err(|e| e.to_string())
        } else {
            let mut builder = hyper::server::conn::http1::Builder::new();
            builder
                .timer(TokioTimer::new())
                .header_read_timeout(settings.idle_timeout);
            if settings.header_buffer_size > 0 {
                builder.max_buf_size(settings.header_buffer_size);
            }
            builder
                .serve_connection(io, service)
                .await
                .map_err(|e| e.to_string())
        }
    };

    tokio::select! {
        result = served => {
            if let Err(e) = result {
                tracing::debug!(%peer, error = %e, "connection ended with error");
            }
        }
        () = stop.triggered() => {
            tracing::debug!(%peer, "connection aborted by shutdown");
        }
    }
}

/// Routes one request across the started contexts.
///
/// Virtual-host-restricted contexts only match when the request's `Host`
/// (port stripped, case-insensitive) is one of theirs; among the path
/// matches the longest context path wins.
fn route(shared: &Shared, req: &Request<Incoming>) -> Response<Full<Bytes>> {
    let path = req.uri().path();
    let request_host = req
        .headers()
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .map(|h| h.split(':').next().unwrap_or(h).to_string());

    let contexts = relock(shared.contexts.read());

    let matched = contexts
        .iter()
        .filter(|c| c.goal_state() == GoalState::Started)
        .filter(|c| host_matches(c, request_host.as_deref()))
        .filter(|c| path_matches(c.descriptor().context_path.as_str(), path))
        .max_by_key(|c| c.descriptor().context_path.len());

    match matched {
        Some(context) => {
            let servlet = context
                .servlets()
                .first()
                .map_or("default", |s| s.name.as_str());
            let body = format!(
                "{{\"context\":{},\"servlet\":{},\"path\":{}}}",
                json_string(&context.descriptor().context_path),
                json_string(servlet),
                json_string(path),
            );
            let content_type = content_type_for(context.mime_overrides(), path);
            respond(StatusCode::OK, &content_type, body)
        }
        None => {
            let body = format!("{{\"error\":\"Not Found\",\"path\":{}}}", json_string(path));
            respond(StatusCode::NOT_FOUND, "application/json", body)
        }
    }
}

fn host_matches(context: &DeployedContext, request_host: Option<&str>) -> bool {
    let vhosts = &context.descriptor().virtual_hosts;
    if vhosts.is_empty() {
        return true;
    }
    let Some(host) = request_host else {
        return false;
    };
    vhosts.iter().any(|v| v.eq_ignore_ascii_case(host))
}

fn path_matches(context_path: &str, path: &str) -> bool {
    if context_path == "/" {
        return true;
    }
    path == context_path || path.starts_with(&format!("{context_path}/"))
}

fn content_type_for(overrides: &HashMap<String, String>, path: &str) -> String {
    path.rsplit_once('.')
        .and_then(|(_, ext)| overrides.get(ext))
        .cloned()
        .unwrap_or_else(|| "application/json".to_string())
}

fn json_string(value: &str) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "\"\"".to_string())
}

fn respond(status: StatusCode, content_type: &str, body: String) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::from(body)));
    *response.status_mut() = status;
    if let Ok(value) = header::HeaderValue::from_str(content_type) {
        response.headers_mut().insert(header::CONTENT_TYPE, value);
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use drydock_core::compute_context;

    fn deployed(name: &str) -> DeployedContext {
        let descriptor = compute_context(name).unwrap();
        let context = WebContext {
            descriptor,
            content_root: PathBuf::from("/tmp/unused"),
            stages: Vec::new(),
            extract: false,
            parent_loader_priority: true,
            temp_directory: None,
            mime_overrides: HashMap::new(),
        };
        let path = context.descriptor.context_path.clone();
        DeployedContext::new(
            context,
            None,
            vec![ServletRegistration {
                name: "default".to_string(),
                path,
            }],
        )
    }

    #[test]
    fn test_path_matching() {
        assert!(path_matches("/demo", "/demo"));
        assert!(path_matches("/demo", "/demo/index.html"));
        assert!(!path_matches("/demo", "/demonstration"));
        assert!(path_matches("/", "/anything"));
    }

    #[test]
    fn test_vhost_matching_ignores_case_and_port() {
        let context = deployed("root-Foo.Example.com.war");
        assert!(host_matches(&context, Some("foo.example.com")));
        assert!(!host_matches(&context, Some("bar.example.com")));
        assert!(!host_matches(&context, None));

        let unrestricted = deployed("demo.war");
        assert!(host_matches(&unrestricted, None));
        assert!(host_matches(&unrestricted, Some("anything")));
    }

    #[test]
    fn test_content_type_uses_overrides() {
        let mut overrides = HashMap::new();
        overrides.insert("svgz".to_string(), "image/svg+xml".to_string());

        assert_eq!(
            content_type_for(&overrides, "/demo/logo.svgz"),
            "image/svg+xml"
        );
        assert_eq!(content_type_for(&overrides, "/demo"), "application/json");
    }

    #[tokio::test]
    async fn test_install_context_requires_running_server() {
        let driver = EmbeddedDriver::new(DriverVariant::Modern);
        let context = WebContext {
            descriptor: compute_context("demo.war").unwrap(),
            content_root: PathBuf::from("/tmp/demo.war"),
            stages: Vec::new(),
            extract: false,
            parent_loader_priority: true,
            temp_directory: None,
            mime_overrides: HashMap::new(),
        };

        let err = driver.install_context(context).await.unwrap_err();
        assert!(matches!(err, DriverError::NotRunning));
    }

    #[tokio::test]
    async fn test_shutdown_without_start_is_tolerated() {
        let driver = EmbeddedDriver::new(DriverVariant::Modern);
        driver.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_duplicate_context_rejected() {
        let driver = EmbeddedDriver::new(DriverVariant::Modern);
        let settings = ConnectorSettings {
            host: "127.0.0.1".to_string(),
            port: 0,
            idle_timeout: Duration::from_secs(30),
            header_buffer_size: 0,
            http2: false,
            tls: None,
        };
        driver.start(settings).await.unwrap();

        let dir = tempfile::tempdir().unwrap();
        let bundle = dir.path().join("demo.war");
        fs::write(&bundle, b"bundle").unwrap();

        let make_context = || WebContext {
            descriptor: compute_context("demo.war").unwrap(),
            content_root: bundle.clone(),
            stages: Vec::new(),
            extract: false,
            parent_loader_priority: true,
            temp_directory: None,
            mime_overrides: HashMap::new(),
        };

        driver.install_context(make_context()).await.unwrap();
        let err = driver.install_context(make_context()).await.unwrap_err();
        assert!(matches!(err, DriverError::DuplicateContext { .. }));

        driver.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_extraction_creates_directory() {
        let driver = EmbeddedDriver::new(DriverVariant::Modern);
        let settings = ConnectorSettings {
            host: "127.0.0.1".to_string(),
            port: 0,
            idle_timeout: Duration::from_secs(30),
            header_buffer_size: 0,
            http2: false,
            tls: None,
        };
        driver.start(settings).await.unwrap();

        let dir = tempfile::tempdir().unwrap();
        let bundle = dir.path().join("demo.war");
        fs::write(&bundle, b"bundle").unwrap();

        let context = WebContext {
            descriptor: compute_context("demo.war").unwrap(),
            content_root: bundle,
            stages: Vec::new(),
            extract: true,
            parent_loader_priority: true,
            temp_directory: None,
            mime_overrides: HashMap::new(),
        };

        let deployed = driver.install_context(context).await.unwrap();
        let extracted = deployed.extracted_root().unwrap().to_path_buf();
        assert!(extracted.is_dir());
        assert!(extracted.join("demo.war").is_file());

        driver.remove_context(&deployed).await.unwrap();
        assert!(!extracted.exists());

        driver.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_dump_lists_contexts() {
        let driver = EmbeddedDriver::new(DriverVariant::Modern);
        let dump = driver.dump();
        assert!(dump.contains("9.4.53"));
        assert!(dump.contains("connector: down"));
    }
}
