pub mod controller;
pub mod indicator;
pub mod nav;
pub mod receiver;
pub mod sensors;
