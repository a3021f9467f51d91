use dynconf_derive::dynconf_error;

#[dynconf_error]
pub enum LoadError {
    Io(std::io::Error),
}

fn main() {}
