mod test_hickory;
mod test_static_lookup;
