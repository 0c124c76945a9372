// src/utils/mod.rs

pub mod form;
pub mod guard;
pub mod hash;
pub mod jwt;
pub mod redirect;
pub mod session;
