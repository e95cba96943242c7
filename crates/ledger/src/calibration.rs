//! Tank calibration charts.
//!
//! Maps liquid depth (cm) to volume (liters) for the horizontal cylinder tanks
//! in service. Readings between chart points are linearly interpolated; a
//! reading outside the chart clamps to the nearest end point.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{
    EngineError, ResultEngine,
    money::round_dp,
    variance::{Tolerance, VarianceResult, classify_with},
};

const VOLUME_SCALE: u32 = 2;
const DEPTH_SCALE: u32 = 1;

/// Nominal tank capacities with a known chart.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum TankCapacity {
    Kl9,
    Kl15,
    Kl22_5,
}

impl TankCapacity {
    pub const ALL: [TankCapacity; 3] = [Self::Kl9, Self::Kl15, Self::Kl22_5];

    /// Nominal capacity in liters.
    #[must_use]
    pub const fn liters(self) -> u32 {
        match self {
            Self::Kl9 => 9_000,
            Self::Kl15 => 15_000,
            Self::Kl22_5 => 22_500,
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Kl9 => "9KL",
            Self::Kl15 => "15KL",
            Self::Kl22_5 => "22.5KL",
        }
    }

    fn chart(self) -> &'static [(u32, i64)] {
        match self {
            Self::Kl9 => CHART_9KL,
            Self::Kl15 => CHART_15KL,
            Self::Kl22_5 => CHART_22_5KL,
        }
    }
}

impl TryFrom<u32> for TankCapacity {
    type Error = EngineError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            9_000 => Ok(Self::Kl9),
            15_000 => Ok(Self::Kl15),
            22_500 => Ok(Self::Kl22_5),
            other => Err(EngineError::InvalidArgument(format!(
                "no calibration chart for {other}L tank"
            ))),
        }
    }
}

impl From<TankCapacity> for u32 {
    fn from(value: TankCapacity) -> Self {
        value.liters()
    }
}

impl core::fmt::Display for TankCapacity {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Clone, Copy, Debug)]
struct Point {
    depth: Decimal,
    volume: Decimal,
}

fn to_point(&(depth_tenths, volume_centi): &(u32, i64)) -> Point {
    Point {
        depth: Decimal::new(i64::from(depth_tenths), DEPTH_SCALE),
        volume: Decimal::new(volume_centi, VOLUME_SCALE),
    }
}

fn points(capacity: TankCapacity) -> impl Iterator<Item = Point> {
    capacity.chart().iter().map(to_point)
}

fn first_and_last(capacity: TankCapacity) -> (Point, Point) {
    let chart = capacity.chart();
    // Charts are non-empty constants.
    let first = chart.first().map(to_point).unwrap_or(Point {
        depth: Decimal::ZERO,
        volume: Decimal::ZERO,
    });
    let last = chart.last().map(to_point).unwrap_or(first);
    (first, last)
}

fn segment(capacity: TankCapacity, inside: impl Fn(&Point, &Point) -> bool) -> Option<(Point, Point)> {
    let mut iter = points(capacity).peekable();
    while let Some(lo) = iter.next() {
        let hi = *iter.peek()?;
        if inside(&lo, &hi) {
            return Some((lo, hi));
        }
    }
    None
}

fn lerp(x: Decimal, x_lo: Decimal, x_hi: Decimal, y_lo: Decimal, y_hi: Decimal) -> Decimal {
    let span = x_hi - x_lo;
    if span.is_zero() {
        return y_lo;
    }
    y_lo + (x - x_lo) / span * (y_hi - y_lo)
}

/// Converts a dip depth (cm) into liters, rounded to two decimals.
///
/// `depth <= 0` is an empty tank.
#[must_use]
pub fn depth_to_volume(depth_cm: Decimal, capacity: TankCapacity) -> Decimal {
    if depth_cm <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    let (first, last) = first_and_last(capacity);
    if depth_cm <= first.depth {
        return first.volume;
    }
    if depth_cm >= last.depth {
        return last.volume;
    }

    match segment(capacity, |lo, hi| depth_cm >= lo.depth && depth_cm <= hi.depth) {
        Some((lo, hi)) => round_dp(
            lerp(depth_cm, lo.depth, hi.depth, lo.volume, hi.volume),
            VOLUME_SCALE,
        ),
        None => last.volume,
    }
}

/// Converts liters back into a dip depth (cm), rounded to one decimal.
#[must_use]
pub fn volume_to_depth(liters: Decimal, capacity: TankCapacity) -> Decimal {
    if liters <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    let (first, last) = first_and_last(capacity);
    if liters <= first.volume {
        return first.depth;
    }
    if liters >= last.volume {
        return last.depth;
    }

    match segment(capacity, |lo, hi| liters >= lo.volume && liters <= hi.volume) {
        Some((lo, hi)) => round_dp(
            lerp(liters, lo.volume, hi.volume, lo.depth, hi.depth),
            DEPTH_SCALE,
        ),
        None => last.depth,
    }
}

/// Deepest charted reading for a tank.
#[must_use]
pub fn max_depth(capacity: TankCapacity) -> Decimal {
    first_and_last(capacity).1.depth
}

/// Rejects readings that cannot come from a dip stick in this tank.
pub fn validate_depth(depth_cm: Decimal, capacity: TankCapacity) -> ResultEngine<()> {
    if depth_cm < Decimal::ZERO {
        return Err(EngineError::InvalidArgument(
            "depth cannot be negative".to_string(),
        ));
    }
    let max = max_depth(capacity);
    if depth_cm > max {
        return Err(EngineError::InvalidArgument(format!(
            "depth exceeds maximum for {capacity} tank (max: {max}cm)"
        )));
    }
    Ok(())
}

/// Liters held between `depth` and `depth + band` cm.
///
/// A dip stick read to within `band` cm cannot tell these volumes apart, so
/// the result is a physical tolerance for stock comparisons.
pub fn depth_band_liters(
    depth_cm: Decimal,
    band_cm: Decimal,
    capacity: TankCapacity,
) -> ResultEngine<Decimal> {
    if band_cm < Decimal::ZERO {
        return Err(EngineError::InvalidArgument(
            "depth band cannot be negative".to_string(),
        ));
    }
    validate_depth(depth_cm, capacity)?;
    let upper = depth_to_volume(depth_cm + band_cm, capacity);
    let lower = depth_to_volume(depth_cm, capacity);
    Ok(upper - lower)
}

/// Compares a tank's book stock with a dip reading.
pub fn reconcile_dip(
    book_stock_liters: Decimal,
    dip_depth_cm: Decimal,
    capacity: TankCapacity,
    tolerance: &Tolerance,
) -> ResultEngine<VarianceResult> {
    validate_depth(dip_depth_cm, capacity)?;
    let dip_liters = depth_to_volume(dip_depth_cm, capacity);
    Ok(classify_with(book_stock_liters, dip_liters, tolerance))
}

// (depth in tenths of cm, volume in hundredths of liters)

const CHART_9KL: &[(u32, i64)] = &[
    (5, 232), (50, 4640), (100, 13104), (150, 24192), (200, 37152), (250, 51584),
    (300, 67248), (350, 83968), (400, 101616), (450, 120096), (500, 139312), (550, 159184),
    (600, 179648), (650, 200656), (700, 222160), (750, 244128), (800, 266528), (850, 289328),
    (900, 312512), (950, 336048), (1000, 359920), (1050, 384112), (1100, 408608), (1150, 433392),
    (1200, 458448), (1250, 483760), (1300, 509312), (1350, 535088), (1400, 561072), (1450, 587248),
    (1500, 613600), (1550, 640112), (1600, 666768), (1650, 693552), (1700, 720448), (1750, 747440),
    (1800, 774512), (1840, 966832),
];

// Points at 100, 150 and 200 cm are the mean of their neighbours; the
// supplier's chart misprints them out of order.
const CHART_15KL: &[(u32, i64)] = &[
    (5, 313), (50, 6260), (100, 17678), (150, 32626), (200, 50109), (250, 69565),
    (300, 90626), (350, 113043), (400, 136713), (450, 161509), (500, 187330), (550, 214087),
    (600, 241696), (650, 270078), (700, 299165), (750, 328891), (800, 359196), (850, 390026),
    (900, 421330), (950, 453061), (1000, 485248), (1050, 517435), (1100, 550087), (1150, 583043),
    (1200, 616261), (1250, 649704), (1300, 683339), (1350, 717130), (1400, 751048), (1450, 785061),
    (1500, 819052), (1550, 853043), (1600, 886957), (1650, 920870), (1700, 954739), (1750, 988522),
    (1800, 1022174), (1850, 1055652), (1900, 1088913), (1950, 1121913), (2000, 1154435), (2050, 1186957),
    (2100, 1218913), (2150, 1546303),
];

const CHART_22_5KL: &[(u32, i64)] = &[
    (5, 379), (50, 7580), (100, 21411), (150, 39508), (200, 60642), (250, 84203),
    (300, 109758), (350, 136973), (400, 165642), (450, 195611), (500, 226758), (550, 258989),
    (600, 292227), (650, 326411), (700, 361473), (750, 397358), (800, 434011), (850, 471380),
    (900, 509411), (950, 548058), (1000, 587273), (1050, 627011), (1100, 667227), (1150, 707880),
    (1200, 748927), (1250, 790327), (1300, 832042), (1350, 874027), (1400, 916242), (1450, 958650),
    (1500, 1001211), (1550, 1043889), (1600, 1086642), (1650, 1129427), (1700, 1172211), (1750, 1214958),
    (1800, 1257627), (1850, 1300180), (1900, 1342573), (1950, 1384773), (2000, 1426742), (2050, 1468442),
    (2100, 1509842), (2150, 1550911), (2200, 1591611), (2250, 1631911), (2300, 1671773), (2350, 1711173),
    (2400, 1750073), (2440, 2410927),
];
