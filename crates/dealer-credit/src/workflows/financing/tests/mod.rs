mod common;

mod amortization;
mod service;
