use chrono::NaiveDateTime;
use typed_config::config_record;

config_record! {
    /// Nested part of the product config.
    pub struct PartConfig {
        property_c: NaiveDateTime,
    }
}

config_record! {
    /// Product configuration, read from `config.yml` in the working directory.
    pub struct ProductConfig {
        property_a: i64,
        property_b: String,
        part_config: PartConfig,
    }
}
