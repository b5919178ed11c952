use super::traits::{RasterError, RasterSource};
use crate::core::models::grid::GeoTransform;
use crate::core::models::point::Crs;
use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tiff::ColorType;
use tiff::decoder::{Decoder, DecodingResult};
use tiff::tags::Tag;
use tracing::{debug, trace};

const GT_RASTER_TYPE_KEY: u32 = 1025;
const GEOGRAPHIC_TYPE_KEY: u32 = 2048;
const PROJECTED_CS_TYPE_KEY: u32 = 3072;
const USER_DEFINED: u32 = 32767;
const RASTER_PIXEL_IS_POINT: u32 = 2;
const MAX_CACHED_CHUNKS: usize = 256;

#[derive(Debug, Clone, Copy)]
enum ChunkLayout {
    Stripped { rows_per_strip: u32 },
    Tiled {
        tile_width: u32,
        tile_height: u32,
        tiles_per_row: u32,
    },
}

impl ChunkLayout {
    /// Chunk index and the pixel's row and column inside that chunk.
    fn locate(&self, col: u32, row: u32) -> (u32, u32, u32) {
        match *self {
            ChunkLayout::Stripped { rows_per_strip } => {
                (row / rows_per_strip, row % rows_per_strip, col)
            }
            ChunkLayout::Tiled {
                tile_width,
                tile_height,
                tiles_per_row,
            } => {
                let index = (row / tile_height) * tiles_per_row + col / tile_width;
                (index, row % tile_height, col % tile_width)
            }
        }
    }

    /// Row stride of the decoded chunk. Edge tiles are decoded without their
    /// right-hand padding, so they are narrower than `tile_width`.
    fn stride(&self, index: u32, image_width: u32) -> u32 {
        match *self {
            ChunkLayout::Stripped { .. } => image_width,
            ChunkLayout::Tiled {
                tile_width,
                tiles_per_row,
                ..
            } => {
                let left = (index % tiles_per_row) * tile_width;
                tile_width.min(image_width.saturating_sub(left))
            }
        }
    }
}

/// First band of a GeoTIFF, decoded one strip or tile at a time.
pub struct GeoTiffRaster {
    decoder: Decoder<BufReader<File>>,
    width: usize,
    height: usize,
    layout: ChunkLayout,
    transform: GeoTransform,
    crs: Crs,
    nodata: Option<f64>,
    cache: HashMap<u32, (usize, Vec<f64>)>,
}

impl std::fmt::Debug for GeoTiffRaster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeoTiffRaster")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("layout", &self.layout)
            .field("crs", &self.crs)
            .field("nodata", &self.nodata)
            .finish_non_exhaustive()
    }
}

impl GeoTiffRaster {
    /// Opens a GeoTIFF and reads its georeferencing.
    ///
    /// `crs_override` replaces whatever the GeoKey directory says; it is required for files
    /// whose CRS cannot be identified.
    pub fn open(path: &Path, crs_override: Option<Crs>) -> Result<Self, RasterError> {
        let file = File::open(path).map_err(|source| RasterError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        let mut decoder = Decoder::new(BufReader::new(file)).map_err(decode_err)?;

        match decoder.colortype().map_err(decode_err)? {
            ColorType::Gray(_) => {}
            other => {
                return Err(RasterError::UnsupportedFormat(format!(
                    "expected a single-band raster, found {other:?}"
                )));
            }
        }

        let (width, height) = decoder.dimensions().map_err(decode_err)?;
        let (chunk_width, chunk_height) = decoder.chunk_dimensions();
        let layout = if chunk_width == width {
            ChunkLayout::Stripped {
                rows_per_strip: chunk_height.max(1),
            }
        } else {
            ChunkLayout::Tiled {
                tile_width: chunk_width,
                tile_height: chunk_height,
                tiles_per_row: width.div_ceil(chunk_width),
            }
        };

        let geo_keys = read_geo_keys(&mut decoder)?;
        let transform = read_transform(&mut decoder, &geo_keys)?;
        let crs = match crs_override {
            Some(crs) => crs,
            None => identify_crs(&mut decoder, &geo_keys)?,
        };
        let nodata = read_nodata(&mut decoder)?;

        debug!(
            path = %path.display(),
            width,
            height,
            ?layout,
            %crs,
            ?nodata,
            "Opened GeoTIFF raster."
        );

        Ok(Self {
            decoder,
            width: width as usize,
            height: height as usize,
            layout,
            transform,
            crs,
            nodata,
            cache: HashMap::new(),
        })
    }

    fn load_chunk(&mut self, index: u32) -> Result<(), RasterError> {
        if self.cache.contains_key(&index) {
            return Ok(());
        }
        if self.cache.len() >= MAX_CACHED_CHUNKS {
            trace!(cached = self.cache.len(), "Evicting GeoTIFF chunk cache.");
            self.cache.clear();
        }
        let stride = self.layout.stride(index, self.width as u32);
        let data = self.decoder.read_chunk(index).map_err(decode_err)?;
        self.cache
            .insert(index, (stride as usize, decoding_result_to_f64(data)?));
        Ok(())
    }
}

impl RasterSource for GeoTiffRaster {
    fn dimensions(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    fn geo_transform(&self) -> GeoTransform {
        self.transform
    }

    fn crs(&self) -> Crs {
        self.crs
    }

    fn nodata(&self) -> Option<f64> {
        self.nodata
    }

    fn read_pixel(&mut self, col: usize, row: usize) -> Result<f64, RasterError> {
        if col >= self.width || row >= self.height {
            return Err(RasterError::PixelOutOfBounds {
                col,
                row,
                width: self.width,
                height: self.height,
            });
        }
        let (index, local_row, local_col) = self.layout.locate(col as u32, row as u32);
        self.load_chunk(index)?;
        let (stride, values) = self.cache.get(&index).ok_or_else(|| {
            RasterError::Decode(format!("chunk {index} missing after load"))
        })?;
        values
            .get(local_row as usize * stride + local_col as usize)
            .copied()
            .ok_or_else(|| RasterError::Decode(format!("chunk {index} is shorter than expected")))
    }
}

fn decode_err(err: tiff::TiffError) -> RasterError {
    RasterError::Decode(err.to_string())
}

fn decoding_result_to_f64(data: DecodingResult) -> Result<Vec<f64>, RasterError> {
    #[allow(unreachable_patterns)]
    let values = match data {
        DecodingResult::U8(v) => v.into_iter().map(f64::from).collect(),
        DecodingResult::U16(v) => v.into_iter().map(f64::from).collect(),
        DecodingResult::U32(v) => v.into_iter().map(f64::from).collect(),
        DecodingResult::U64(v) => v.into_iter().map(|x| x as f64).collect(),
        DecodingResult::I8(v) => v.into_iter().map(f64::from).collect(),
        DecodingResult::I16(v) => v.into_iter().map(f64::from).collect(),
        DecodingResult::I32(v) => v.into_iter().map(f64::from).collect(),
        DecodingResult::I64(v) => v.into_iter().map(|x| x as f64).collect(),
        DecodingResult::F32(v) => v.into_iter().map(f64::from).collect(),
        DecodingResult::F64(v) => v,
        _ => {
            return Err(RasterError::UnsupportedFormat(
                "unrecognised sample type".to_string(),
            ));
        }
    };
    Ok(values)
}

/// GeoKey id -> inline SHORT value. Keys stored in other tags are skipped.
fn read_geo_keys(
    decoder: &mut Decoder<BufReader<File>>,
) -> Result<HashMap<u32, u32>, RasterError> {
    let Some(value) = decoder
        .find_tag(Tag::GeoKeyDirectoryTag)
        .map_err(decode_err)?
    else {
        return Ok(HashMap::new());
    };
    let directory = value.into_u32_vec().map_err(decode_err)?;
    if directory.len() < 4 {
        return Err(RasterError::InvalidData(
            "GeoKey directory header is truncated".to_string(),
        ));
    }
    let key_count = directory[3] as usize;
    Ok(directory[4..]
        .chunks_exact(4)
        .take(key_count)
        .filter(|entry| entry[1] == 0)
        .map(|entry| (entry[0], entry[3]))
        .collect())
}

fn read_transform(
    decoder: &mut Decoder<BufReader<File>>,
    geo_keys: &HashMap<u32, u32>,
) -> Result<GeoTransform, RasterError> {
    let pixel_is_point = geo_keys.get(&GT_RASTER_TYPE_KEY) == Some(&RASTER_PIXEL_IS_POINT);

    if let Some(value) = decoder
        .find_tag(Tag::ModelTransformationTag)
        .map_err(decode_err)?
    {
        let m = value.into_f64_vec().map_err(decode_err)?;
        if m.len() < 8 {
            return Err(RasterError::MissingGeoreference(
                "ModelTransformation tag has fewer than 8 values".to_string(),
            ));
        }
        let transform = GeoTransform::from_coefficients([m[3], m[0], m[1], m[7], m[4], m[5]]);
        return Ok(shift_if_point(transform, pixel_is_point));
    }

    let scale = decoder
        .find_tag(Tag::ModelPixelScaleTag)
        .map_err(decode_err)?
        .map(|v| v.into_f64_vec())
        .transpose()
        .map_err(decode_err)?;
    let tiepoint = decoder
        .find_tag(Tag::ModelTiepointTag)
        .map_err(decode_err)?
        .map(|v| v.into_f64_vec())
        .transpose()
        .map_err(decode_err)?;

    match (scale, tiepoint) {
        (Some(scale), Some(tie)) if scale.len() >= 2 && tie.len() >= 6 => {
            let (i, j, x, y) = (tie[0], tie[1], tie[3], tie[4]);
            let (sx, sy) = (scale[0], scale[1]);
            let transform = GeoTransform::north_up(x - i * sx, y + j * sy, sx, -sy);
            Ok(shift_if_point(transform, pixel_is_point))
        }
        _ => Err(RasterError::MissingGeoreference(
            "neither ModelTransformation nor ModelPixelScale + ModelTiepoint present".to_string(),
        )),
    }
}

fn shift_if_point(transform: GeoTransform, pixel_is_point: bool) -> GeoTransform {
    if !pixel_is_point {
        return transform;
    }
    let (x, y) = transform.pixel_to_geo(-0.5, -0.5);
    GeoTransform {
        origin_x: x,
        origin_y: y,
        ..transform
    }
}

fn identify_crs(
    decoder: &mut Decoder<BufReader<File>>,
    geo_keys: &HashMap<u32, u32>,
) -> Result<Crs, RasterError> {
    for key in [PROJECTED_CS_TYPE_KEY, GEOGRAPHIC_TYPE_KEY] {
        if let Some(&code) = geo_keys.get(&key) {
            if code != USER_DEFINED && code != 0 {
                return Ok(Crs::new(code));
            }
        }
    }

    // User-defined Mollweide (as written for GHS population grids) is recognised by citation.
    let citation = decoder
        .find_tag(Tag::GeoAsciiParamsTag)
        .map_err(decode_err)?
        .map(|v| v.into_string())
        .transpose()
        .map_err(decode_err)?;
    if citation.is_some_and(|c| c.to_ascii_lowercase().contains("mollweide")) {
        return Ok(Crs::WORLD_MOLLWEIDE);
    }
    Err(RasterError::UnknownCrs)
}

fn read_nodata(decoder: &mut Decoder<BufReader<File>>) -> Result<Option<f64>, RasterError> {
    let Some(value) = decoder.find_tag(Tag::GdalNodata).map_err(decode_err)? else {
        return Ok(None);
    };
    let text = value.into_string().map_err(decode_err)?;
    let trimmed = text.trim_matches(|c: char| c == '\0' || c.is_whitespace());
    trimmed
        .parse::<f64>()
        .map(Some)
        .map_err(|_| RasterError::InvalidData(format!("GDAL_NODATA value '{trimmed}' is not a number")))
}
