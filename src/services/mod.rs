pub mod database;
pub mod form_store;
pub mod pricing;
pub mod submission;
pub mod validator;

#[cfg(test)]
mod submission_test;
