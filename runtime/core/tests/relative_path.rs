use std::env;
use std::fs;

use typed_config::{config_record, resolve_path, Record};

config_record! {
    pub struct RelativeConfig {
        port: u16,
    }
}

// Lives in its own test binary: it changes the process working directory.
#[test]
fn default_source_path_is_fixed_at_schema_build() {
    let dir = tempfile::tempdir().expect("temp dir");
    let root = dir.path().canonicalize().expect("canonical temp dir");
    env::set_current_dir(&root).expect("chdir");
    fs::write(root.join("config.yml"), "port: 8080\n").expect("write config");

    let resolved = resolve_path("config.yml", false).expect("resolve");
    assert_eq!(resolved, root.join("config.yml"));

    let mut config = RelativeConfig::create();
    assert_eq!(config.source_path(), root.join("config.yml").as_path());
    config.load().expect("load");
    assert_eq!(*config.port().expect("port"), 8080);

    let nested = root.join("nested");
    fs::create_dir(&nested).expect("mkdir");
    fs::write(nested.join("config.yml"), "port: 9090\n").expect("write nested");
    env::set_current_dir(&nested).expect("chdir nested");

    // Explicit relative paths resolve at call time, the default stays put.
    assert_eq!(RelativeConfig::create().source_path(), root.join("config.yml").as_path());
    config.load_from("config.yml", false).expect("load nested");
    assert_eq!(*config.port().expect("port"), 9090);

    env::set_current_dir(env::temp_dir()).expect("leave temp dir");
}
