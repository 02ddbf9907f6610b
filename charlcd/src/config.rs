use charlcd_gpio::backend::PortBackend;
use charlcd_gpio::lcd::hd44780::driver::PinMap;
use dotenv::var;
use eyre::eyre;
use serde::{Deserialize, Serialize};
use std::env::var_os;
use std::fs::File;
use std::io::{BufReader, BufWriter, ErrorKind};
use std::path::{Path, PathBuf};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Port backend name, see [PortBackend].
    pub backend: String,
    /// First line of the six-line bank the display is wired to.
    pub pin_base: usize,
    pub line1: String,
    pub line2: String,
}

impl Config {
    fn path() -> PathBuf {
        var_os("CONFIG_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("charlcd.json"))
    }

    /// Loads the config file, or `None` if there is none yet.
    ///
    /// A file that exists but can't be read or parsed is an error, so it never gets replaced by
    /// defaults.
    pub fn try_load() -> eyre::Result<Option<Self>> {
        Self::try_load_from(&Self::path())
    }

    fn try_load_from(config_path: &Path) -> eyre::Result<Option<Self>> {
        let file = match File::open(config_path) {
            Ok(file) => file,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(eyre!("Can't open {}: {}", config_path.display(), err)),
        };
        let reader = BufReader::new(file);
        let config = serde_json::from_reader(reader)
            .map_err(|err| eyre!("Malformed config {}: {}", config_path.display(), err))?;
        Ok(Some(config))
    }

    pub fn save(&self) -> std::io::Result<()> {
        self.save_to(&Self::path())
    }

    fn save_to(&self, config_path: &Path) -> std::io::Result<()> {
        let file = File::create(config_path)?;
        let writer = BufWriter::new(file);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    /// Applies `CHARLCD_BACKEND` and `CHARLCD_PIN_BASE` from the environment on top of the file.
    pub fn with_env_overrides(self) -> eyre::Result<Self> {
        self.with_overrides(var("CHARLCD_BACKEND").ok(), var("CHARLCD_PIN_BASE").ok())
    }

    fn with_overrides(
        mut self,
        backend: Option<String>,
        pin_base: Option<String>,
    ) -> eyre::Result<Self> {
        if let Some(backend) = backend {
            self.backend = backend;
        }
        if let Some(pin_base) = pin_base {
            self.pin_base = pin_base.trim().parse()?;
        }
        Ok(self)
    }

    pub fn backend(&self) -> eyre::Result<PortBackend> {
        Ok(self.backend.parse()?)
    }

    pub fn pins(&self) -> eyre::Result<PinMap> {
        PinMap::new(self.pin_base)
            .map_err(|_| eyre!("Pin base {} leaves no room for 6 lines", self.pin_base))
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            backend: PortBackend::default().to_string(),
            pin_base: 20,
            line1: "3.3V I/O".to_string(),
            line2: "LCD DISP".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_take_defaults() {
        let config: Config = serde_json::from_str(r#"{ "line1": "Hello" }"#).unwrap();
        assert_eq!(config.line1, "Hello");
        assert_eq!(config.line2, "LCD DISP");
        assert_eq!(config.pin_base, 20);
        assert_eq!(config.backend().unwrap(), PortBackend::GpioMem);
    }

    #[test]
    fn environment_overrides_file_values() {
        let config = Config::default()
            .with_overrides(Some("memory".to_string()), Some(" 4 ".to_string()))
            .unwrap();
        assert_eq!(config.backend().unwrap(), PortBackend::Memory);
        assert_eq!(config.pins().unwrap().base(), 4);
    }

    #[test]
    fn rejects_bad_values() {
        assert!(Config::default().with_overrides(None, Some("twenty".to_string())).is_err());

        let config = Config { pin_base: 27, ..Config::default() };
        assert!(config.pins().is_err());

        let config = Config { backend: "sysfs".to_string(), ..Config::default() };
        assert!(config.backend().is_err());
    }

    /// Config file in the temp directory, removed on drop.
    struct TempConfig {
        path: PathBuf,
    }

    impl TempConfig {
        fn new(name: &str) -> Self {
            let path = std::env::temp_dir()
                .join(format!("charlcd-{}-{}.json", name, std::process::id()));
            TempConfig { path }
        }
    }

    impl Drop for TempConfig {
        fn drop(&mut self) {
            _ = std::fs::remove_file(&self.path);
        }
    }

    #[test]
    fn missing_file_loads_nothing() {
        let config = Config::try_load_from(Path::new("/nonexistent/charlcd.json")).unwrap();
        assert_eq!(config, None);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let file = TempConfig::new("malformed");
        let contents = r#"{ "line1": "Hello", "pin_base": "twenty" }"#;
        std::fs::write(&file.path, contents).unwrap();

        assert!(Config::try_load_from(&file.path).is_err());
        // Left as the user wrote it
        assert_eq!(std::fs::read_to_string(&file.path).unwrap(), contents);
    }

    #[test]
    fn saved_config_loads_back() {
        let file = TempConfig::new("saved");
        let config = Config { pin_base: 4, line1: "Hello".to_string(), ..Config::default() };
        config.save_to(&file.path).unwrap();

        assert_eq!(Config::try_load_from(&file.path).unwrap(), Some(config));
    }
}
