//! Creates one writer per configured action.

use camino::{Utf8Path, Utf8PathBuf};
use rf_core::{ActionConfig, Config, OutputConfig, RecordSink};

use crate::error::WriteError;
use crate::writer::BufferedWriter;

/// Builds [`BufferedWriter`]s that share an output folder and settings.
///
/// # Examples
///
/// ```no_run
/// use rf_core::{ActionConfig, ActionKind, OutputConfig};
/// use rf_output::WriterFactory;
///
/// # async fn example() -> Result<(), rf_output::WriteError> {
/// let factory = WriterFactory::new("/data/out", OutputConfig::default());
/// let sink = factory.create_sink(&ActionConfig::new(ActionKind::Group))?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct WriterFactory {
    output_folder: Utf8PathBuf,
    config: OutputConfig,
}

impl WriterFactory {
    /// Creates a factory writing into `output_folder`.
    pub fn new(output_folder: impl Into<Utf8PathBuf>, config: OutputConfig) -> Self {
        Self {
            output_folder: output_folder.into(),
            config,
        }
    }

    /// Uses the output folder and writer settings of `config`.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.output_folder.clone(), config.output)
    }

    /// The folder new writers write into.
    #[inline]
    #[must_use]
    pub fn output_folder(&self) -> &Utf8Path {
        &self.output_folder
    }

    /// Creates a writer for `group`.
    ///
    /// # Errors
    ///
    /// See [`BufferedWriter::new`].
    pub fn create(&self, group: &str) -> Result<BufferedWriter, WriteError> {
        BufferedWriter::new(self.output_folder.clone(), group, &self.config)
    }

    /// Creates the writer for `action`, boxed as a [`RecordSink`].
    ///
    /// # Errors
    ///
    /// See [`BufferedWriter::new`].
    pub fn create_sink(&self, action: &ActionConfig) -> Result<Box<dyn RecordSink>, WriteError> {
        Ok(Box::new(self.create(&action.group_name)?))
    }
}
