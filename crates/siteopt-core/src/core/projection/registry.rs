use crate::core::models::point::Crs;

/// PROJ definition string for a supported CRS, or `None` if the code is unknown.
pub fn proj_string(crs: Crs) -> Option<&'static str> {
    match crs.code() {
        4326 => Some("+proj=longlat +datum=WGS84 +no_defs"),
        3857 => Some(
            "+proj=merc +a=6378137 +b=6378137 +lat_ts=0 +lon_0=0 +x_0=0 +y_0=0 +k=1 +units=m +no_defs",
        ),
        54009 => Some("+proj=moll +lon_0=0 +x_0=0 +y_0=0 +datum=WGS84 +units=m +no_defs"),
        6933 => Some("+proj=cea +lat_ts=30 +lon_0=0 +x_0=0 +y_0=0 +datum=WGS84 +units=m +no_defs"),
        3035 => Some(
            "+proj=laea +lat_0=52 +lon_0=10 +x_0=4321000 +y_0=3210000 +ellps=GRS80 +units=m +no_defs",
        ),
        _ => None,
    }
}

pub fn is_supported(crs: Crs) -> bool {
    proj_string(crs).is_some()
}

/// Whether coordinates in `crs` are longitude/latitude degrees.
pub fn is_geographic(crs: Crs) -> bool {
    crs.code() == 4326
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_codes_have_definitions() {
        for crs in [
            Crs::WGS84,
            Crs::WEB_MERCATOR,
            Crs::WORLD_MOLLWEIDE,
            Crs::EASE_GRID_2,
            Crs::LAEA_EUROPE,
        ] {
            assert!(is_supported(crs), "{crs} should be supported");
        }
        assert!(!is_supported(Crs::new(99999)));
    }

    #[test]
    fn only_wgs84_is_geographic() {
        assert!(is_geographic(Crs::WGS84));
        assert!(!is_geographic(Crs::WORLD_MOLLWEIDE));
    }
}
