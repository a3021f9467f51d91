use dynconf_derive::Shape;

#[derive(Shape)]
pub struct Pair(u8, u8);

fn main() {
    let _ = Pair(1, 2);
}
