//! Typed row access and `imgref` views.
#![cfg(feature = "rgb")]

use rgb::alt::BGRA8;
use rgb::{RGB8, RGBA8};
use zenraster::*;

fn rgb_ramp(w: u32, h: u32) -> Image<'static> {
    let mut image = Image::new(w, h, PixelType::Rgb8, Layout::NONE).unwrap();
    for y in 0..h {
        for (x, px) in image.row_as_mut::<RGB8>(y).unwrap().iter_mut().enumerate() {
            *px = RGB8::new(x as u8, y as u8, (x as u8 + y as u8) * 10);
        }
    }
    image
}

#[test]
fn typed_rows_match_raw_bytes() {
    let image = rgb_ramp(5, 3);
    for y in 0..3 {
        let typed = image.row_as::<RGB8>(y).unwrap();
        let raw = image.scanline(y).unwrap();
        assert_eq!(typed.len(), 5);
        for (px, bytes) in typed.iter().zip(raw.chunks_exact(3)) {
            assert_eq!([px.r, px.g, px.b], [bytes[0], bytes[1], bytes[2]]);
        }
    }
    let rows: Vec<_> = image.rows_as::<RGB8>().unwrap().collect();
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[2][4], RGB8::new(4, 2, 60));
}

#[test]
fn bgra_rows_keep_byte_order() {
    let mut image = Image::new(2, 1, PixelType::Bgra8, Layout::NONE).unwrap();
    image.row_as_mut::<BGRA8>(0).unwrap()[1] = BGRA8 {
        b: 1,
        g: 2,
        r: 3,
        a: 4,
    };
    assert_eq!(&image.scanline(0).unwrap()[4..], &[1, 2, 3, 4]);
    image.convert(PixelType::Rgba8, Layout::NONE).unwrap();
    assert_eq!(image.row_as::<RGBA8>(0).unwrap()[1], RGBA8::new(3, 2, 1, 4));
}

#[test]
fn wrong_pixel_type_is_refused() {
    let mut image = rgb_ramp(2, 2);
    let expected_mismatch = |err: ImageError| {
        assert_eq!(
            err,
            ImageError::PixelTypeMismatch {
                expected: PixelType::Rgba8,
                actual: PixelType::Rgb8,
            }
        );
    };
    expected_mismatch(image.row_as::<RGBA8>(0).unwrap_err());
    expected_mismatch(image.row_as_mut::<RGBA8>(0).unwrap_err());
    expected_mismatch(image.rows_as::<RGBA8>().err().unwrap());
    assert!(!image.is_errored());
}

#[test]
fn row_out_of_range_is_invalid_argument() {
    let mut image = rgb_ramp(2, 2);
    assert!(matches!(
        image.row_as::<RGB8>(2),
        Err(ImageError::InvalidArgument(_))
    ));
    assert!(matches!(
        image.row_as_mut::<RGB8>(7),
        Err(ImageError::InvalidArgument(_))
    ));
}

#[test]
fn views_refuse_mutable_rows() {
    let owned = rgb_ramp(4, 4);
    let mut view = owned.view().unwrap();
    assert_eq!(view.row_as::<RGB8>(1).unwrap(), owned.row_as::<RGB8>(1).unwrap());
    assert_eq!(view.row_as_mut::<RGB8>(1).unwrap_err(), ImageError::NotOwned);

    let mut sub = owned.sub_image(1, 1, 2, 2).unwrap();
    assert_eq!(sub.row_as::<RGB8>(0).unwrap(), &owned.row_as::<RGB8>(1).unwrap()[1..3]);
    assert_eq!(sub.row_as_mut::<RGB8>(0).unwrap_err(), ImageError::NotOwned);
}

#[cfg(feature = "imgref")]
mod imgref_views {
    use super::*;
    use zenraster::layout::{Alignment, Orientation};

    #[test]
    fn aligned_image_views_with_pixel_stride() {
        let mut image = Image::new(
            3,
            2,
            PixelType::Rgba8,
            Layout::new().with_alignment(Alignment::B64),
        )
        .unwrap();
        image.row_as_mut::<RGBA8>(1).unwrap()[2] = RGBA8::new(9, 8, 7, 6);
        let view = image.as_imgref::<RGBA8>().unwrap();
        assert_eq!((view.width(), view.height()), (3, 2));
        assert_eq!(view.stride(), image.pitch() as usize / 4);
        assert_eq!(view[(2usize, 1usize)], RGBA8::new(9, 8, 7, 6));
    }

    #[test]
    fn imgvec_is_packed_copy() {
        let image = rgb_ramp(4, 3);
        let vec = image.to_imgvec::<RGB8>().unwrap();
        assert_eq!(vec.stride(), 4);
        assert_eq!(vec.buf().len(), 12);
        assert_eq!(vec[(3usize, 2usize)], RGB8::new(3, 2, 50));
    }

    #[test]
    fn from_imgref_borrows_with_stride() {
        let buf: Vec<RGB8> = (0..12u8).map(|i| RGB8::new(i, i, i)).collect();
        let img = imgref::ImgRef::new_stride(&buf[..], 3, 3, 4);
        let image = Image::from_imgref(img).unwrap();
        assert!(image.is_view());
        assert_eq!(image.pixel_type(), PixelType::Rgb8);
        assert_eq!(image.pitch(), 12);
        assert_eq!(image.scanline(2).unwrap(), &[8, 8, 8, 9, 9, 9, 10, 10, 10]);
    }

    #[test]
    fn view_refused_for_mismatch_flip_or_odd_pitch() {
        let image = rgb_ramp(2, 2);
        assert!(matches!(
            image.as_imgref::<RGBA8>(),
            Err(ImageError::PixelTypeMismatch { .. })
        ));
        assert!(matches!(
            image.to_imgvec::<RGBA8>(),
            Err(ImageError::PixelTypeMismatch { .. })
        ));

        let flipped = Image::new(
            2,
            2,
            PixelType::Rgb8,
            Layout::new().with_orientation(Orientation::Flipped),
        )
        .unwrap();
        assert!(flipped.pitch() < 0);
        assert!(matches!(
            flipped.as_imgref::<RGB8>(),
            Err(ImageError::InvalidLayout(_))
        ));
        assert_eq!(flipped.to_imgvec::<RGB8>().unwrap().buf().len(), 4);

        let bytes = [0u8; 18];
        let odd = Image::from_borrowed(&bytes, 2, 2, 10, PixelType::Rgba8).unwrap();
        assert!(matches!(
            odd.as_imgref::<RGBA8>(),
            Err(ImageError::InvalidLayout(_))
        ));

        let empty = Image::empty(PixelType::Rgb8);
        assert!(matches!(
            empty.as_imgref::<RGB8>(),
            Err(ImageError::InvalidArgument(_))
        ));
    }
}
