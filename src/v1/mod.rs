pub mod cloud;
pub mod config;
pub mod datastore;
pub mod descriptor;
pub mod handler;
pub mod local;
pub mod manager;
pub mod plan;
pub mod provider;
pub mod resource;
pub mod solutions;
pub mod storage;
pub mod telemetry;
