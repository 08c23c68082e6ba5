use log::{debug, info, warn};

use venvman_backend::{Driver, DriverStatus, VenvError};
use venvman_drivers::builtin_drivers;
use venvman_shell::Settings;

/// The drivers venvman can choose from, in registration order.
#[derive(Default)]
pub struct DriverRegistry {
    drivers: Vec<Box<dyn Driver>>,
}

impl DriverRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All built-in drivers, configured from `settings`.
    #[must_use]
    pub fn builtin(settings: &Settings) -> Self {
        Self {
            drivers: builtin_drivers(settings),
        }
    }

    /// Add a driver after the ones already registered. A driver with the
    /// same name replaces the earlier one in place.
    pub fn register(&mut self, driver: Box<dyn Driver>) {
        match self
            .drivers
            .iter()
            .position(|existing| existing.name() == driver.name())
        {
            Some(index) => self.drivers[index] = driver,
            None => self.drivers.push(driver),
        }
    }

    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        self.drivers.iter().map(|driver| driver.name()).collect()
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&dyn Driver> {
        self.drivers
            .iter()
            .find(|driver| driver.name() == name)
            .map(|driver| &**driver)
    }

    /// Drivers eligible for selection: excluded ones dropped, preferred ones
    /// moved to the front.
    #[must_use]
    pub fn candidates(&self, settings: &Settings) -> Vec<&dyn Driver> {
        let eligible: Vec<&'static str> = self
            .names()
            .into_iter()
            .filter(|name| !settings.is_excluded(name))
            .collect();

        preferred_order(&eligible, &settings.preferred_drivers)
            .into_iter()
            .filter_map(|name| self.get(name))
            .collect()
    }

    /// The first candidate whose backend is available.
    ///
    /// A missing tool or bad configuration moves on to the next candidate.
    /// Any other probe failure means the backend is installed but broken and
    /// is returned as is.
    pub async fn select(&self, settings: &Settings) -> Result<&dyn Driver, VenvError> {
        let candidates = self.candidates(settings);
        let mut reasons = Vec::new();

        for driver in &candidates {
            match driver.check_availability().await {
                Ok(()) => {
                    info!("Selected driver {}", driver.name());
                    return Ok(*driver);
                }
                Err(e) if e.is_unavailability() => {
                    debug!("Driver {} is unavailable: {e}", driver.name());
                    reasons.push((driver.name().to_string(), e.to_string()));
                }
                Err(e) => {
                    warn!("Driver {} failed its availability check: {e}", driver.name());
                    return Err(e);
                }
            }
        }

        Err(VenvError::NoDriverAvailable {
            tried: candidates
                .iter()
                .map(|driver| driver.name().to_string())
                .collect(),
            reasons,
        })
    }

    /// Availability of every registered driver, excluded ones included.
    pub async fn statuses(&self) -> Vec<DriverStatus> {
        let mut statuses = Vec::with_capacity(self.drivers.len());
        for driver in &self.drivers {
            statuses.push(driver.status().await);
        }
        statuses
    }
}

impl std::fmt::Debug for DriverRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DriverRegistry")
            .field("drivers", &self.names())
            .finish()
    }
}

/// Reorder `names` so the `preferred` ones come first, in preference order.
/// Preferred names that are not in `names` are ignored.
#[must_use]
pub fn preferred_order<'a>(names: &[&'a str], preferred: &[String]) -> Vec<&'a str> {
    let mut ordered: Vec<&'a str> = Vec::with_capacity(names.len());
    for wanted in preferred {
        if let Some(name) = names.iter().copied().find(|name| *name == wanted.as_str())
            && !ordered.contains(&name)
        {
            ordered.push(name);
        }
    }
    for &name in names {
        if !ordered.contains(&name) {
            ordered.push(name);
        }
    }
    ordered
}

#[cfg(test)]
mod tests {
    use std::path::{Path, PathBuf};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use venvman_backend::{DriverKind, MakeOptions};
    use venvman_shell::parse_list;

    use super::*;

    struct MockDriver {
        name: &'static str,
        failure: Option<VenvError>,
        checks: Arc<AtomicUsize>,
    }

    impl MockDriver {
        fn new(name: &'static str, available: bool) -> Self {
            Self {
                name,
                failure: (!available).then(|| VenvError::CommandNotFound {
                    details: format!("{name} is not installed"),
                }),
                checks: Arc::new(AtomicUsize::new(0)),
            }
        }

        fn boxed(name: &'static str, available: bool) -> Box<dyn Driver> {
            Box::new(Self::new(name, available))
        }
    }

    #[async_trait]
    impl Driver for MockDriver {
        fn name(&self) -> &'static str {
            self.name
        }

        fn display_name(&self) -> &'static str {
            self.name
        }

        fn kind(&self) -> DriverKind {
            DriverKind::PlainDirectory
        }

        async fn check_availability(&self) -> Result<(), VenvError> {
            self.checks.fetch_add(1, Ordering::SeqCst);
            match &self.failure {
                Some(error) => Err(error.clone()),
                None => Ok(()),
            }
        }

        async fn list(&self) -> Result<Vec<String>, VenvError> {
            Ok(vec![])
        }

        async fn create(&self, name: &str, _: &MakeOptions) -> Result<PathBuf, VenvError> {
            Ok(PathBuf::from(name))
        }

        async fn remove(&self, _: &str) -> Result<(), VenvError> {
            Ok(())
        }

        async fn resolve(&self, name: &str) -> Result<PathBuf, VenvError> {
            Err(VenvError::not_found(name))
        }

        async fn python_version(&self, _: &Path) -> Result<String, VenvError> {
            Ok("3.11.4".to_string())
        }
    }

    fn registry(drivers: &[(&'static str, bool)]) -> DriverRegistry {
        let mut registry = DriverRegistry::new();
        for &(name, available) in drivers {
            registry.register(MockDriver::boxed(name, available));
        }
        registry
    }

    fn settings(preferred: &str, excluded: &str) -> Settings {
        Settings {
            preferred_drivers: parse_list(preferred),
            excluded_drivers: parse_list(excluded),
            ..Settings::default()
        }
    }

    #[test]
    fn preferred_order_moves_preferred_names_first() {
        assert_eq!(
            preferred_order(&["d1", "d2", "d3"], &parse_list("d3,d1")),
            vec!["d3", "d1", "d2"]
        );
    }

    #[test]
    fn preferred_order_ignores_unknown_names() {
        assert_eq!(
            preferred_order(&["d1", "d2"], &parse_list("nope,d2,d2")),
            vec!["d2", "d1"]
        );
        assert_eq!(preferred_order(&["d1", "d2"], &[]), vec!["d1", "d2"]);
    }

    #[tokio::test]
    async fn first_available_driver_in_registration_order_wins() {
        let registry = registry(&[("a", false), ("b", true), ("c", true)]);

        let driver = registry.select(&Settings::default()).await.unwrap();

        assert_eq!(driver.name(), "b");
    }

    #[tokio::test]
    async fn preference_overrides_registration_order() {
        let registry = registry(&[("a", true), ("b", true)]);

        let driver = registry.select(&settings("b,a", "")).await.unwrap();

        assert_eq!(driver.name(), "b");
    }

    #[tokio::test]
    async fn excluded_drivers_are_never_selected_even_when_preferred() {
        let registry = registry(&[("a", true), ("b", true)]);

        let driver = registry.select(&settings("b", "b")).await.unwrap();

        assert_eq!(driver.name(), "a");
        assert_eq!(registry.candidates(&settings("b", "b")).len(), 1);
    }

    #[tokio::test]
    async fn excluding_everything_reports_no_driver() {
        let registry = registry(&[("a", true), ("b", true)]);

        let Err(error) = registry.select(&settings("", "a,b")).await else {
            panic!("expected no driver to be selected");
        };

        assert_eq!(
            error,
            VenvError::NoDriverAvailable {
                tried: vec![],
                reasons: vec![],
            }
        );
    }

    #[tokio::test]
    async fn unavailable_drivers_are_listed_with_reasons() {
        let registry = registry(&[("a", false), ("b", false)]);

        let Err(error) = registry.select(&Settings::default()).await else {
            panic!("expected no driver to be selected");
        };

        let VenvError::NoDriverAvailable { tried, reasons } = &error else {
            panic!("expected NoDriverAvailable, got {error:?}");
        };
        assert_eq!(tried, &vec!["a".to_string(), "b".to_string()]);
        assert_eq!(reasons.len(), 2);
        assert!(error.to_string().contains("a: Command not found: a is not installed"));
    }

    #[tokio::test]
    async fn availability_is_checked_lazily_in_order() {
        let first_checks = Arc::new(AtomicUsize::new(0));
        let second_checks = Arc::new(AtomicUsize::new(0));
        let mut registry = DriverRegistry::new();
        registry.register(Box::new(MockDriver {
            checks: Arc::clone(&first_checks),
            ..MockDriver::new("first", true)
        }));
        registry.register(Box::new(MockDriver {
            checks: Arc::clone(&second_checks),
            ..MockDriver::new("second", true)
        }));

        registry.select(&Settings::default()).await.unwrap();

        assert_eq!(first_checks.load(Ordering::SeqCst), 1);
        assert_eq!(second_checks.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn broken_backend_is_reported_instead_of_skipped() {
        let broken = VenvError::Execution {
            command: "lsvirtualenv -b".to_string(),
            status: 2,
            output: "virtualenvwrapper.sh: syntax error".to_string(),
        };
        let fallback_checks = Arc::new(AtomicUsize::new(0));
        let mut registry = DriverRegistry::new();
        registry.register(Box::new(MockDriver {
            failure: Some(broken.clone()),
            ..MockDriver::new("virtualenvwrapper", true)
        }));
        registry.register(Box::new(MockDriver {
            checks: Arc::clone(&fallback_checks),
            ..MockDriver::new("venv", true)
        }));

        let Err(error) = registry.select(&Settings::default()).await else {
            panic!("a broken backend must not hand over to the next driver");
        };

        assert_eq!(error, broken);
        assert_eq!(fallback_checks.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn missing_interpreter_counts_as_unavailable() {
        let mut registry = DriverRegistry::new();
        registry.register(Box::new(MockDriver {
            failure: Some(VenvError::PythonNotFound {
                python: "python3 or python".to_string(),
            }),
            ..MockDriver::new("venv", true)
        }));
        registry.register(MockDriver::boxed("conda", true));

        let driver = registry.select(&Settings::default()).await.unwrap();

        assert_eq!(driver.name(), "conda");
    }

    #[test]
    fn registering_a_known_name_replaces_it_in_place() {
        let mut registry = registry(&[("a", false), ("b", true)]);
        registry.register(MockDriver::boxed("a", true));

        assert_eq!(registry.names(), vec!["a", "b"]);
    }

    #[test]
    fn builtin_registry_uses_default_priority_order() {
        assert_eq!(
            DriverRegistry::builtin(&Settings::default()).names(),
            vec![
                "virtualenvwrapper",
                "virtualenv-sh",
                "pyenv-virtualenv",
                "conda",
                "venv"
            ]
        );
    }

    #[tokio::test]
    async fn statuses_cover_every_driver() {
        let registry = registry(&[("a", false), ("b", true)]);

        let statuses = registry.statuses().await;

        assert_eq!(statuses.len(), 2);
        assert!(!statuses[0].available);
        assert!(statuses[0].reason.is_some());
        assert!(statuses[1].available);
    }
}
