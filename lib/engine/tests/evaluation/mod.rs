mod errors;
mod operators;
mod paths;
mod test_utils;
mod timeout;
