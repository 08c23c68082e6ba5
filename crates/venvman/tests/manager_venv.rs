use venvman::{MakeOptions, PackageSpec, PythonRequest, Settings, VenvError, VenvManager};

const OTHER_DRIVERS: [&str; 4] = ["virtualenvwrapper", "virtualenv-sh", "pyenv-virtualenv", "conda"];

fn python_available() -> bool {
    which::which("python3").is_ok() || which::which("python").is_ok()
}

fn venv_only(base: std::path::PathBuf) -> VenvManager {
    VenvManager::with_settings(Settings {
        venv_dir: Some(base),
        excluded_drivers: OTHER_DRIVERS.iter().map(ToString::to_string).collect(),
        ..Settings::default()
    })
}

#[tokio::test]
async fn manages_plain_environments_end_to_end() {
    if !python_available() {
        eprintln!("skipping: no python interpreter on the search path");
        return;
    }

    let temp_dir = tempfile::tempdir().expect("create temp dir");
    let base = temp_dir.path().join("envs");
    let manager = venv_only(base.clone()).with_cached_selection();

    assert_eq!(manager.driver_name().await.unwrap(), "venv");
    assert!(manager.list_virtual_envs().await.unwrap().is_empty());

    let options = MakeOptions {
        pip: PackageSpec::Omit,
        ..MakeOptions::default()
    };
    let env_dir = manager
        .make_virtual_env_with("demo", &options)
        .await
        .unwrap();
    assert_eq!(env_dir, base.join("demo"));
    assert_eq!(manager.resolve_virtual_env("demo").await.unwrap(), env_dir);
    assert_eq!(manager.list_virtual_envs().await.unwrap(), vec!["demo"]);

    let version = manager.python_version(&env_dir).await.unwrap();
    assert!(version.starts_with('3'), "unexpected version {version}");
    assert!(venvman::python_executable_path(&env_dir).unwrap().exists());

    assert_eq!(
        manager.make_virtual_env_with("demo", &options).await,
        Err(VenvError::exists("demo"))
    );

    let ensured = manager
        .ensure_virtual_env_with("demo", Some(&version), false, &options)
        .await
        .unwrap();
    assert_eq!(ensured, env_dir);

    manager.remove_virtual_env("demo").await.unwrap();
    assert_eq!(
        manager.resolve_virtual_env("demo").await,
        Err(VenvError::not_found("demo"))
    );
    manager.discard_virtual_env("demo").await.unwrap();
}

#[tokio::test]
async fn unknown_interpreter_is_reported() {
    let temp_dir = tempfile::tempdir().expect("create temp dir");
    let manager = venv_only(temp_dir.path().join("envs"));
    if !manager.has_driver().await {
        return;
    }

    let options = MakeOptions {
        python: Some(PythonRequest::Version("0.1".to_string())),
        ..MakeOptions::default()
    };

    let err = manager
        .make_virtual_env_with("demo", &options)
        .await
        .unwrap_err();
    assert!(matches!(err, VenvError::PythonNotFound { .. }), "{err}");
}

#[tokio::test]
async fn excluding_every_driver_reports_what_was_tried() {
    let mut excluded: Vec<String> = OTHER_DRIVERS.iter().map(ToString::to_string).collect();
    excluded.push("venv".to_string());
    let manager = VenvManager::with_settings(Settings {
        excluded_drivers: excluded,
        ..Settings::default()
    });

    assert!(!manager.has_driver().await);
    let err = manager.list_virtual_envs().await.unwrap_err();
    assert!(matches!(err, VenvError::NoDriverAvailable { ref tried, .. } if tried.is_empty()));
}
