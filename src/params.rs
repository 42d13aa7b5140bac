//! Simulation parameters: grid geometry, physics, discretization and the
//! derived timestep/CFL coefficients.
//!
//! [`SimSpec`] is the raw, unvalidated input record (what the parameter file
//! carries, in file order). [`SimParams`] is the validated, immutable set the
//! rest of the crate consumes by shared reference; the timestep and CFL
//! coefficients are derived once at construction and never change.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::HaloGridError;

/// Safety margin applied to the explicit-scheme stability limit: the derived
/// timestep lands just under the bound, never on it.
const CFL_MARGIN: f64 = 0.5 - 1.0e-4;

/// Discretization order of the finite-difference stencil.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Order {
    /// 2nd order: 3-point stencil per axis, halo width 1.
    Second,
    /// 4th order: 5-point stencil per axis, halo width 2.
    Fourth,
    /// 8th order: 9-point stencil per axis, halo width 4.
    Eighth,
}

impl Order {
    /// Parse the numeric order field of the parameter file.
    pub fn from_int(order: u32) -> Result<Self, HaloGridError> {
        match order {
            2 => Ok(Order::Second),
            4 => Ok(Order::Fourth),
            8 => Ok(Order::Eighth),
            other => Err(HaloGridError::UnsupportedOrder(other)),
        }
    }

    /// The numeric order as it appears in parameter files.
    pub const fn as_int(self) -> u32 {
        match self {
            Order::Second => 2,
            Order::Fourth => 4,
            Order::Eighth => 8,
        }
    }

    /// Stencil radius, which is also the halo width in cells.
    pub const fn radius(self) -> usize {
        match self {
            Order::Second => 1,
            Order::Fourth => 2,
            Order::Eighth => 4,
        }
    }
}

/// How the global grid is partitioned among ranks.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Decomposition {
    /// 1-D horizontal bands, one per rank.
    Stripe,
    /// 2-D row-major blocks over a square rank grid.
    Block,
}

impl Decomposition {
    /// Parse the numeric mode field of the parameter file.
    pub fn from_int(mode: i64) -> Result<Self, HaloGridError> {
        match mode {
            1 => Ok(Decomposition::Stripe),
            2 => Ok(Decomposition::Block),
            other => Err(HaloGridError::UnsupportedDecomposition(other)),
        }
    }

    /// The numeric mode as it appears in parameter files.
    pub const fn as_int(self) -> i64 {
        match self {
            Decomposition::Stripe => 1,
            Decomposition::Block => 2,
        }
    }
}

/// Whether halo exchange is serialized against computation or overlapped
/// with the interior pass.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Scheduling {
    /// Wait for all transfers before touching any cell.
    Synchronous,
    /// Compute the interior while transfers are in flight.
    Overlapped,
}

/// Dirichlet boundary values, one per domain edge.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoundaryValues {
    /// Value stamped on the top edge.
    pub top: f64,
    /// Value stamped on the left edge.
    pub left: f64,
    /// Value stamped on the bottom edge.
    pub bottom: f64,
    /// Value stamped on the right edge.
    pub right: f64,
}

/// Raw simulation inputs, in parameter-file order.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SimSpec {
    /// Grid points in x.
    pub nx: usize,
    /// Grid points in y.
    pub ny: usize,
    /// Physical extent in x.
    pub lx: f64,
    /// Physical extent in y.
    pub ly: f64,
    /// Diffusion coefficient.
    pub alpha: f64,
    /// Number of timesteps to run.
    pub iters: usize,
    /// Discretization order (2, 4 or 8).
    pub order: u32,
    /// Uniform initial condition.
    pub ic: f64,
    /// Decomposition mode (1 = stripe, 2 = block).
    pub decomposition: i64,
    /// Synchronous (true) or overlapped (false) scheduling.
    pub synchronous: bool,
    /// Boundary values, top/left/bottom/right.
    pub bc: BoundaryValues,
}

impl Default for SimSpec {
    fn default() -> Self {
        Self {
            nx: 10,
            ny: 10,
            lx: 1.0,
            ly: 1.0,
            alpha: 1.0,
            iters: 1000,
            order: 2,
            ic: 5.0,
            decomposition: 1,
            synchronous: true,
            bc: BoundaryValues {
                top: 0.0,
                left: 10.0,
                bottom: 0.0,
                right: 10.0,
            },
        }
    }
}

/// Validated, immutable simulation configuration.
///
/// Constructed once from a [`SimSpec`] and shared read-only across all
/// components for the lifetime of the run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SimParams {
    nx: usize,
    ny: usize,
    lx: f64,
    ly: f64,
    alpha: f64,
    iters: usize,
    order: Order,
    ic: f64,
    decomposition: Decomposition,
    scheduling: Scheduling,
    bc: BoundaryValues,
    dx: f64,
    dy: f64,
    dt: f64,
    xcfl: f64,
    ycfl: f64,
}

impl SimParams {
    /// Validate a raw spec and derive cell spacing, timestep and CFL
    /// coefficients.
    ///
    /// # Errors
    /// - [`HaloGridError::Config`] on degenerate geometry or physics
    /// - [`HaloGridError::UnsupportedOrder`] / [`HaloGridError::UnsupportedDecomposition`]
    ///   on out-of-range enum fields
    pub fn new(spec: &SimSpec) -> Result<Self, HaloGridError> {
        if spec.nx < 2 || spec.ny < 2 {
            return Err(HaloGridError::Config(format!(
                "grid must be at least 2x2, got {}x{}",
                spec.nx, spec.ny
            )));
        }
        if !(spec.lx > 0.0) || !(spec.ly > 0.0) {
            return Err(HaloGridError::Config(format!(
                "physical extents must be positive, got {} x {}",
                spec.lx, spec.ly
            )));
        }
        if !(spec.alpha > 0.0) {
            return Err(HaloGridError::Config(format!(
                "diffusion coefficient must be positive, got {}",
                spec.alpha
            )));
        }
        let order = Order::from_int(spec.order)?;
        let decomposition = Decomposition::from_int(spec.decomposition)?;
        let scheduling = if spec.synchronous {
            Scheduling::Synchronous
        } else {
            Scheduling::Overlapped
        };

        let dx = spec.lx / (spec.nx - 1) as f64;
        let dy = spec.ly / (spec.ny - 1) as f64;
        let (dt, xcfl, ycfl) = derive_cfl(order, spec.alpha, dx, dy);

        Ok(Self {
            nx: spec.nx,
            ny: spec.ny,
            lx: spec.lx,
            ly: spec.ly,
            alpha: spec.alpha,
            iters: spec.iters,
            order,
            ic: spec.ic,
            decomposition,
            scheduling,
            bc: spec.bc,
            dx,
            dy,
            dt,
            xcfl,
            ycfl,
        })
    }

    /// Load parameters from the fixed-order whitespace-separated file format:
    /// `nx ny lx ly alpha iters order ic mode sync top left bottom right`.
    ///
    /// # Errors
    /// [`HaloGridError::Config`] on unreadable input, missing fields or
    /// fields that fail to parse; the validation errors of [`SimParams::new`]
    /// otherwise.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, HaloGridError> {
        let mut text = String::new();
        let mut reader = BufReader::new(reader);
        reader
            .read_to_string(&mut text)
            .map_err(|e| HaloGridError::Config(format!("could not read parameter input: {e}")))?;
        let mut fields = text.split_whitespace();
        let mut next = |name: &str| {
            fields
                .next()
                .ok_or_else(|| HaloGridError::Config(format!("missing field `{name}`")))
        };
        fn parse<T: std::str::FromStr>(raw: &str, name: &str) -> Result<T, HaloGridError> {
            raw.parse()
                .map_err(|_| HaloGridError::Config(format!("invalid value `{raw}` for `{name}`")))
        }

        let nx = parse(next("nx")?, "nx")?;
        let ny = parse(next("ny")?, "ny")?;
        let lx = parse(next("lx")?, "lx")?;
        let ly = parse(next("ly")?, "ly")?;
        let alpha = parse(next("alpha")?, "alpha")?;
        let iters = parse(next("iters")?, "iters")?;
        let order = parse(next("order")?, "order")?;
        let ic = parse(next("ic")?, "ic")?;
        let decomposition = parse(next("mode")?, "mode")?;
        let sync: i64 = parse(next("sync")?, "sync")?;
        let top = parse(next("topBC")?, "topBC")?;
        let left = parse(next("leftBC")?, "leftBC")?;
        let bottom = parse(next("bottomBC")?, "bottomBC")?;
        let right = parse(next("rightBC")?, "rightBC")?;

        Self::new(&SimSpec {
            nx,
            ny,
            lx,
            ly,
            alpha,
            iters,
            order,
            ic,
            decomposition,
            synchronous: sync != 0,
            bc: BoundaryValues {
                top,
                left,
                bottom,
                right,
            },
        })
    }

    /// Load parameters from a file on disk.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, HaloGridError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| {
            HaloGridError::Config(format!(
                "could not open parameter file `{}`: {e}",
                path.display()
            ))
        })?;
        Self::from_reader(file)
    }

    /// Grid points in x.
    pub fn nx(&self) -> usize {
        self.nx
    }

    /// Grid points in y.
    pub fn ny(&self) -> usize {
        self.ny
    }

    /// Physical extent in x.
    pub fn lx(&self) -> f64 {
        self.lx
    }

    /// Physical extent in y.
    pub fn ly(&self) -> f64 {
        self.ly
    }

    /// Diffusion coefficient.
    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    /// Number of timesteps to run.
    pub fn iters(&self) -> usize {
        self.iters
    }

    /// Discretization order.
    pub fn order(&self) -> Order {
        self.order
    }

    /// Uniform initial condition.
    pub fn ic(&self) -> f64 {
        self.ic
    }

    /// Decomposition mode.
    pub fn decomposition(&self) -> Decomposition {
        self.decomposition
    }

    /// Scheduling discipline.
    pub fn scheduling(&self) -> Scheduling {
        self.scheduling
    }

    /// Boundary values.
    pub fn bc(&self) -> BoundaryValues {
        self.bc
    }

    /// Cell spacing in x.
    pub fn dx(&self) -> f64 {
        self.dx
    }

    /// Cell spacing in y.
    pub fn dy(&self) -> f64 {
        self.dy
    }

    /// Derived timestep, strictly under the stability limit.
    pub fn dt(&self) -> f64 {
        self.dt
    }

    /// CFL coefficient in x.
    pub fn xcfl(&self) -> f64 {
        self.xcfl
    }

    /// CFL coefficient in y.
    pub fn ycfl(&self) -> f64 {
        self.ycfl
    }

    /// Echo the full parameter set through the `log` facade. Intended for
    /// rank 0 at startup.
    pub fn log_summary(&self) {
        log::info!(
            "nx: {} ny: {} lx: {} ly: {} alpha: {} iterations: {} order: {} ic: {} scheduling: {:?}",
            self.nx,
            self.ny,
            self.lx,
            self.ly,
            self.alpha,
            self.iters,
            self.order.as_int(),
            self.ic,
            self.scheduling,
        );
        log::info!(
            "decomposition: {} topBC: {} leftBC: {} bottomBC: {} rightBC: {} dx: {} dy: {} dt: {} xcfl: {} ycfl: {}",
            self.decomposition.as_int(),
            self.bc.top,
            self.bc.left,
            self.bc.bottom,
            self.bc.right,
            self.dx,
            self.dy,
            self.dt,
            self.xcfl,
            self.ycfl,
        );
    }
}

impl Default for SimParams {
    fn default() -> Self {
        Self::new(&SimSpec::default()).expect("default spec is valid")
    }
}

/// Timestep and CFL coefficients for the explicit scheme at a given order.
///
/// The constant term of the stability bound depends on the stencil
/// coefficients; the margin keeps the timestep strictly under the limit.
fn derive_cfl(order: Order, alpha: f64, dx: f64, dy: f64) -> (f64, f64, f64) {
    let dx2 = dx * dx;
    let dy2 = dy * dy;
    match order {
        Order::Second => {
            let dt = CFL_MARGIN * (dx2 * dy2) / (alpha * (dx2 + dy2));
            (dt, alpha * dt / dx2, alpha * dt / dy2)
        }
        Order::Fourth => {
            let dt = CFL_MARGIN * (12.0 * dx2 * dy2) / (16.0 * alpha * (dx2 + dy2));
            (dt, alpha * dt / (12.0 * dx2), alpha * dt / (12.0 * dy2))
        }
        Order::Eighth => {
            let dt = CFL_MARGIN * (5040.0 * dx2 * dy2) / (8064.0 * alpha * (dx2 + dy2));
            (dt, alpha * dt / (5040.0 * dx2), alpha * dt / (5040.0 * dy2))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn default_configuration_values() {
        let p = SimParams::default();
        assert_eq!(p.nx(), 10);
        assert_eq!(p.ny(), 10);
        assert_eq!(p.order(), Order::Second);
        assert_eq!(p.decomposition(), Decomposition::Stripe);
        assert_eq!(p.scheduling(), Scheduling::Synchronous);
        assert_eq!(p.ic(), 5.0);
        assert_eq!(p.bc().left, 10.0);
        assert_eq!(p.bc().top, 0.0);
        // dx = lx / (nx - 1)
        assert!((p.dx() - 1.0 / 9.0).abs() < 1e-15);
    }

    #[test]
    fn order_radius_table() {
        assert_eq!(Order::Second.radius(), 1);
        assert_eq!(Order::Fourth.radius(), 2);
        assert_eq!(Order::Eighth.radius(), 4);
        assert!(matches!(
            Order::from_int(3),
            Err(HaloGridError::UnsupportedOrder(3))
        ));
    }

    #[test]
    fn bad_decomposition_mode_is_rejected() {
        let spec = SimSpec {
            decomposition: 7,
            ..SimSpec::default()
        };
        assert!(matches!(
            SimParams::new(&spec),
            Err(HaloGridError::UnsupportedDecomposition(7))
        ));
    }

    #[test]
    fn parse_fixed_order_parameter_file() {
        let text = "64 48\n2.0 1.5\n0.5\n200\n4\n5.0\n2\n0\n0 10 0 10\n";
        let p = SimParams::from_reader(text.as_bytes()).unwrap();
        assert_eq!(p.nx(), 64);
        assert_eq!(p.ny(), 48);
        assert_eq!(p.order(), Order::Fourth);
        assert_eq!(p.decomposition(), Decomposition::Block);
        assert_eq!(p.scheduling(), Scheduling::Overlapped);
        assert_eq!(p.iters(), 200);
        assert_eq!(p.bc().right, 10.0);
    }

    #[test]
    fn truncated_parameter_file_is_rejected() {
        let text = "10 10 1.0 1.0 1.0 100";
        let err = SimParams::from_reader(text.as_bytes()).unwrap_err();
        assert!(matches!(err, HaloGridError::Config(_)));
    }

    #[test]
    fn garbage_field_is_rejected() {
        let text = "10 ten 1.0 1.0 1.0 100 2 5.0 1 1 0 10 0 10";
        let err = SimParams::from_reader(text.as_bytes()).unwrap_err();
        assert!(matches!(err, HaloGridError::Config(_)));
    }

    proptest! {
        /// The derived timestep keeps both CFL coefficients strictly under
        /// 0.5 for every order and any reasonable geometry.
        #[test]
        fn cfl_coefficients_stay_under_half(
            nx in 3usize..512,
            ny in 3usize..512,
            lx in 1e-3f64..1e3,
            ly in 1e-3f64..1e3,
            alpha in 1e-3f64..1e3,
            order in prop::sample::select(vec![2u32, 4, 8]),
        ) {
            let spec = SimSpec {
                nx, ny, lx, ly, alpha,
                order,
                ..SimSpec::default()
            };
            let p = SimParams::new(&spec).unwrap();
            prop_assert!(p.xcfl() < 0.5);
            prop_assert!(p.ycfl() < 0.5);
            prop_assert!(p.dt() > 0.0);
        }
    }
}
