pub mod phase0 {
    pub mod consts;
    pub mod primitives;
}
