pub mod path_validator;

#[cfg(test)]
pub(crate) mod test_server;
