//! Text I/O for geometries crossing the system boundary.
//!
//! Points and region polygons arrive as well-known text (`POINT(x y)`,
//! `POLYGON((...))`), optionally carrying an EWKT `SRID=n;` prefix.

pub mod wkt;
