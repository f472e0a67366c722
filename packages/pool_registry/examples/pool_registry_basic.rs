//! Pools bullets per weapon and explosions per prototype, printing the lifecycle
//! events that the registry emits at debug level and above.

use pool_registry::{Capabilities, HostObject, Poolable, Registry, Reusable, global};
use tracing::Level;

#[derive(Debug, Default)]
struct Bullet {
    fired: u32,
}

impl Reusable for Bullet {
    fn create(&self) -> Self {
        Self::default()
    }

    fn on_get(&mut self) {
        self.fired = self.fired.wrapping_add(1);
    }
}

impl Poolable for Bullet {
    fn capabilities() -> Capabilities<Self> {
        Capabilities::new().constructible().reusable()
    }
}

#[derive(Clone, Debug, Eq, Hash, PartialEq)]
struct Explosion {
    effect: &'static str,
    visible: bool,
}

impl HostObject for Explosion {
    fn attach_new() -> Self {
        Self {
            effect: "default",
            visible: true,
        }
    }

    fn duplicate(&self) -> Self {
        self.clone()
    }

    fn set_active(&mut self, active: bool) {
        self.visible = active;
    }

    fn is_active(&self) -> bool {
        self.visible
    }

    fn destroy(&mut self) {
        println!("explosion {} destroyed", self.effect);
    }
}

impl Poolable for Explosion {
    fn capabilities() -> Capabilities<Self> {
        Capabilities::new().host_object()
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_max_level(Level::DEBUG)
        .init();

    let registry = Registry::builder().label("Arena").build();

    registry
        .get_keyed_pool::<Bullet, &'static str>()
        .on_get(|weapon, bullet| println!("{weapon} fired bullet #{}", bullet.fired));

    for _ in 0..3 {
        let bullet = registry.get_keyed::<Bullet, &'static str>(&"rifle").unwrap();
        registry.release_keyed(&"rifle", bullet);
    }

    let bullet = registry.get_keyed::<Bullet, &'static str>(&"pistol").unwrap();
    registry.release_keyed(&"pistol", bullet);

    let fireball = Explosion {
        effect: "fireball",
        visible: true,
    };

    let explosion = global::get_from_prototype(&fireball).unwrap();
    println!("{} visible while in use: {}", explosion.effect, explosion.is_active());
    global::release_to_prototype(&fireball, explosion);

    registry.clear();
    global::bootstrap();
}
