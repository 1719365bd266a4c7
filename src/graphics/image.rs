use std::iter::{self, Iterator};
use std::mem;

use rayon::prelude::*;

/// Row-major 2D image. Used both as framebuffer attachment and as a
/// sampled resource.
#[derive(Debug, Clone, PartialEq)]
pub struct Image<T: Sized> {
    data: Vec<T>,
    width: usize,
    height: usize,
}

impl<T: Sized + Default> Image<T> {
    pub fn new(width: usize, height: usize) -> Image<T> {
        let total_pixels = width * height;

        Image {
            data: Vec::from_iter(iter::repeat_with(|| T::default()).take(total_pixels)),
            width,
            height,
        }
    }
}

impl<T: Sized> Image<T> {
    pub fn from_fn<F: FnMut(usize, usize) -> T>(width: usize, height: usize, mut f: F) -> Image<T> {
        Image {
            data: CoordinateIterator::new(width, height)
                .map(|(x, y)| f(x, y))
                .collect(),
            width,
            height,
        }
    }

    fn index_of(&self, x: usize, y: usize) -> Option<usize> {
        if x >= self.width || y >= self.height {
            None
        } else {
            Some(y * self.width + x)
        }
    }

    pub fn at(&self, x: usize, y: usize) -> Option<&T> {
        self.index_of(x, y).map(|index| &self.data[index])
    }

    pub fn exchange(&mut self, x: usize, y: usize, value: T) -> Option<T> {
        self.index_of(x, y).map(|index| {
            let mut other = value;
            mem::swap(&mut other, &mut self.data[index]);

            other
        })
    }

    pub fn size(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    pub fn data(&self) -> &[T] {
        &self.data
    }

    pub fn coordinates(&self) -> CoordinateIterator {
        CoordinateIterator::new(self.width, self.height)
    }
}

impl<T: Sized + Copy + Send + Sync> Image<T> {
    pub fn fill(&mut self, value: T) {
        self.data.par_iter_mut().for_each(|pixel| *pixel = value);
    }
}

pub struct CoordinateIterator {
    pixel_index: usize,
    width: usize,
    height: usize,
}

impl CoordinateIterator {
    pub(crate) fn new(width: usize, height: usize) -> CoordinateIterator {
        CoordinateIterator {
            pixel_index: 0,
            width,
            height,
        }
    }
}

impl Iterator for CoordinateIterator {
    type Item = (usize, usize);

    fn next(&mut self) -> Option<Self::Item> {
        let total_pixels = self.width * self.height;
        if self.pixel_index >= total_pixels {
            return None;
        }

        let x = self.pixel_index % self.width;
        let y = self.pixel_index / self.width;
        self.pixel_index += 1;

        Some((x, y))
    }
}
