mod pipeline;
mod test_utils;
