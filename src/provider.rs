//! Sources for the canned configuration returned to `get-config`.

use std::future::Future;
use std::io;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::Arc;

/// Boxed future returned by providers.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Router configuration served when the host was given none.
pub const DEFAULT_ROUTER_CONFIG: &str = "\
<version>10.0R1</version>
<system>
  <host-name>router-a</host-name>
  <services>
    <ssh/>
    <netconf>
      <ssh/>
    </netconf>
  </services>
</system>
<interfaces>
  <interface>
    <name>ge-0/0/0</name>
    <unit>
      <name>0</name>
      <family>
        <inet>
          <address>
            <name>192.0.2.1/24</name>
          </address>
        </inet>
      </family>
    </unit>
  </interface>
  <interface>
    <name>lo0</name>
    <unit>
      <name>0</name>
      <family>
        <inet>
          <address>
            <name>127.0.0.1/32</name>
          </address>
        </inet>
      </family>
    </unit>
  </interface>
</interfaces>
";

/// Supplies the configuration document, as inner XML of `<configuration>`.
pub trait ConfigProvider: Send + Sync + 'static {
    fn configuration(&self) -> BoxFuture<'static, io::Result<String>>;
}

/// In-memory configuration.
#[derive(Debug, Clone)]
pub struct StaticConfig {
    content: Arc<str>,
}

impl StaticConfig {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: Arc::from(content.into()),
        }
    }
}

impl Default for StaticConfig {
    fn default() -> Self {
        Self::new(DEFAULT_ROUTER_CONFIG)
    }
}

impl ConfigProvider for StaticConfig {
    fn configuration(&self) -> BoxFuture<'static, io::Result<String>> {
        let content = self.content.to_string();
        Box::pin(async move { Ok(content) })
    }
}

/// Configuration read from disk on every request.
///
/// Edits to the file are visible to the next `get-config` without a restart.
#[derive(Debug, Clone)]
pub struct FileConfig {
    path: PathBuf,
}

impl FileConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }
}

impl ConfigProvider for FileConfig {
    fn configuration(&self) -> BoxFuture<'static, io::Result<String>> {
        let path = self.path.clone();
        Box::pin(async move {
            tracing::debug!("Loading configuration from {}", path.display());
            tokio::fs::read_to_string(&path).await
        })
    }
}
