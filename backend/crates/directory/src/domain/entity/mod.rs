//! Entity Module

pub mod city;
pub mod user;
