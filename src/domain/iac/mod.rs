pub mod resource_config;
