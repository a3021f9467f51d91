use dynconf_derive::dynconf_error;

#[dynconf_error]
pub enum LoadError {
    Io { source: std::io::Error },
}

fn main() {}
