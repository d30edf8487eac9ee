use quickcheck::Arbitrary;

use crate::Aabb;

/// A list of entity stamps, some of them reaching past a 32 x 32 grid
/// (64 x 64 world units at tile size 8 and scale 4).
#[derive(Clone, Debug)]
pub struct StampInput {
    pub entities: Vec<(usize, Aabb)>,
}

impl Arbitrary for StampInput {
    fn arbitrary(g: &mut quickcheck::Gen) -> Self {
        let len = usize::arbitrary(g) % 12;
        let entities = (0..len)
            .map(|_| {
                let channel = usize::arbitrary(g) % 9 + 1;
                let left = f64::from(i8::arbitrary(g) % 80);
                let top = f64::from(i8::arbitrary(g) % 80);
                let width = f64::from(u8::arbitrary(g) % 24);
                let height = f64::from(u8::arbitrary(g) % 24);
                let aabb = Aabb {
                    left,
                    right: left + width,
                    top,
                    bottom: top + height,
                };
                (channel, aabb)
            })
            .collect();
        StampInput { entities }
    }

    fn shrink(&self) -> Box<dyn Iterator<Item = Self>> {
        let entities = self.entities.clone();
        Box::new((0..entities.len()).map(move |skip| StampInput {
            entities: entities
                .iter()
                .enumerate()
                .filter(|&(idx, _)| idx != skip)
                .map(|(_, &entity)| entity)
                .collect(),
        }))
    }
}
