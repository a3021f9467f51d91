use dynconf_derive::Shape;

#[derive(Shape)]
pub struct Limits {
    #[serde(flatten)] extra: Vec<u8>,
}

fn main() {
    let _ = Limits { extra: Vec::new() };
}
