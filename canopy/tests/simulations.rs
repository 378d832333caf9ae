#[test]
fn lone_coordinator() {
    canopy::simulations::lone_coordinator()
}

#[test]
fn first_join() {
    canopy::simulations::first_join()
}

#[test]
fn sibling_join() {
    canopy::simulations::sibling_join()
}

#[test]
fn mesh_lookup() {
    canopy::simulations::mesh_lookup()
}

#[test]
fn renewal() {
    canopy::simulations::renewal()
}

#[test]
fn release_rejoin() {
    canopy::simulations::release_rejoin()
}

#[test]
fn lossy_join() {
    canopy::simulations::lossy_join()
}
